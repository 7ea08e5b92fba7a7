use serde::Deserialize;

/// One configured feed: the label shown to readers and the endpoint fetched.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FeedSource {
    #[serde(rename = "name")]
    pub label: String,
    #[serde(rename = "url")]
    pub endpoint: String,
}

impl FeedSource {
    pub fn new(label: &str, endpoint: &str) -> Self {
        Self {
            label: label.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Ordered, read-only list of feeds. Fixed once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRegistry {
    sources: Vec<FeedSource>,
}

impl FeedRegistry {
    pub fn new(sources: Vec<FeedSource>) -> Self {
        Self { sources }
    }

    /// The feeds used when no configuration overrides them.
    pub fn builtin() -> Self {
        Self::new(vec![
            FeedSource::new("CNN", "https://rss.cnn.com/rss/edition_world.rss"),
            FeedSource::new("BBC", "https://feeds.bbci.co.uk/news/world/rss.xml"),
            FeedSource::new(
                "Google News",
                "https://news.google.com/rss/search?q=China&hl=en-US&gl=US&ceid=US:en",
            ),
        ])
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Labels in registry order, for building a source filter.
    pub fn labels(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
