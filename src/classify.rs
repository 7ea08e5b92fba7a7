//! Maps a publisher domain to a human-readable name.

use serde::Deserialize;

/// A single classification rule: any domain under `suffix` belongs to `name`.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct PublisherRule {
    pub suffix: String,
    pub name: String,
}

impl PublisherRule {
    pub fn new(suffix: &str, name: &str) -> Self {
        Self {
            suffix: suffix.to_ascii_lowercase(),
            name: name.to_string(),
        }
    }

    /// Plain string suffix test; `cnbc.com` matches `nbc.com`.
    fn matches(&self, domain: &str) -> bool {
        domain.ends_with(self.suffix.as_str())
    }
}

const BUILTIN_RULES: &[(&str, &str)] = &[
    ("cnn.com", "CNN"),
    ("bbc.co.uk", "BBC"),
    ("bbc.com", "BBC"),
    ("reuters.com", "Reuters"),
    ("nytimes.com", "The New York Times"),
    ("bloomberg.com", "Bloomberg"),
    ("nbcnews.com", "NBC News"),
    ("nbc.com", "NBC News"),
    ("politico.com", "Politico"),
    ("wsj.com", "Wall Street Journal"),
    ("thewallstreetjournal.com", "Wall Street Journal"),
    ("scmp.com", "South China Morning Post"),
    ("apnews.com", "AP News"),
    ("foxnews.com", "Fox News"),
    ("newsweek.com", "Newsweek"),
];

/// Domain-suffix rules, matched longest suffix first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherTable {
    rules: Vec<PublisherRule>,
}

impl PublisherTable {
    pub fn new(rules: Vec<PublisherRule>) -> Self {
        Self { rules }
    }

    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_RULES
                .iter()
                .map(|(suffix, name)| PublisherRule::new(suffix, name))
                .collect(),
        )
    }

    /// Append rules after the existing ones. Later rules only win on a longer suffix.
    pub fn extend<I: IntoIterator<Item = PublisherRule>>(&mut self, rules: I) {
        self.rules.extend(rules.into_iter().map(|r| PublisherRule::new(&r.suffix, &r.name)));
    }

    /// Publisher name for `domain`, if any rule covers it.
    pub fn lookup(&self, domain: &str) -> Option<&str> {
        let domain = domain.to_ascii_lowercase();
        let mut best: Option<&PublisherRule> = None;
        for rule in &self.rules {
            if rule.matches(&domain) && best.map_or(true, |b| rule.suffix.len() > b.suffix.len()) {
                best = Some(rule);
            }
        }
        best.map(|r| r.name.as_str())
    }

    /// Empty domain falls back to the feed label; an unmapped domain is its own label.
    pub fn classify(&self, domain: &str, feed_label: &str) -> String {
        if domain.is_empty() {
            return feed_label.to_string();
        }
        match self.lookup(domain) {
            Some(name) => name.to_string(),
            None => domain.to_ascii_lowercase(),
        }
    }
}

impl Default for PublisherTable {
    fn default() -> Self {
        Self::builtin()
    }
}
