//! Turns one feed's raw entries into relevant, attributed articles.
//!
//! Publisher detection tries, in order: the entry's `source.href`, a URL
//! embedded in the summary markup, a `url`/`u`/`q` query parameter on the
//! link, and finally the percent-decoded link itself. The order is a tunable
//! heuristic. Aggregator wrapper links are then followed to their destination.

use std::sync::{Arc, LazyLock};

use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use crate::article::Article;
use crate::classify::PublisherTable;
use crate::entry::RawEntry;
use crate::resolver::{resolve_cached, RedirectResolver, ResolutionCache};

/// Host of the aggregator whose links wrap the real publisher URL.
pub const WRAPPER_HOST: &str = "news.google.com";

const WRAPPER_MARKER: &str = "news.google";

const REDIRECT_PARAMS: [&str; 3] = ["url", "u", "q"];

static EMBEDDED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s"<>]+"#).unwrap());

pub struct Extractor {
    keywords: Vec<String>,
    publishers: PublisherTable,
    resolver: Arc<dyn RedirectResolver>,
}

impl Extractor {
    pub fn new(
        keywords: &[String],
        publishers: PublisherTable,
        resolver: Arc<dyn RedirectResolver>,
    ) -> Self {
        Self {
            keywords: keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            publishers,
            resolver,
        }
    }

    /// Case-insensitive substring match on `title + " " + summary`.
    /// With no keywords configured every entry is relevant.
    pub fn is_relevant(&self, title: &str, summary: &str) -> bool {
        if self.keywords.is_empty() {
            return true;
        }
        let haystack = format!("{} {}", title, summary).to_lowercase();
        self.keywords.iter().any(|k| haystack.contains(k.as_str()))
    }

    pub async fn extract<I>(
        &self,
        feed_label: &str,
        entries: I,
        cache: &ResolutionCache,
    ) -> Vec<Article>
    where
        I: IntoIterator<Item = RawEntry>,
    {
        let mut articles = Vec::new();

        for entry in entries {
            let title = entry.title.as_deref().unwrap_or_default().trim().to_string();
            let link = entry.link.as_deref().unwrap_or_default().trim().to_string();
            let summary = entry.summary.clone().unwrap_or_default();

            if !self.is_relevant(&title, &summary) {
                continue;
            }

            let netloc = self.publisher_domain(&entry, &link, &summary, cache).await;
            let source = self.publishers.classify(&netloc, feed_label);

            articles.push(Article {
                title,
                url: link,
                summary,
                published: entry.published.unwrap_or_default(),
                source,
                feed_source: feed_label.to_string(),
            });
        }

        debug!("Extracted {} relevant items from '{}'", articles.len(), feed_label);
        articles
    }

    /// Publisher domain without `www.`; empty when nothing usable was found.
    async fn publisher_domain(
        &self,
        entry: &RawEntry,
        link: &str,
        summary: &str,
        cache: &ResolutionCache,
    ) -> String {
        let candidate = candidate_url(entry, link, summary);
        let mut netloc = netloc_of(&candidate);
        let canonical = if candidate.is_empty() { link } else { candidate.as_str() };

        if is_wrapper(&netloc, canonical) {
            match resolve_cached(self.resolver.as_ref(), cache, canonical).await {
                Ok(resolved) => netloc = netloc_of(&resolved),
                Err(e) => warn!("Keeping unresolved wrapper link {}: {}", canonical, e),
            }
            // Still on the wrapper: it is not the publisher.
            if netloc.contains(WRAPPER_HOST) {
                netloc.clear();
            }
        }

        strip_www(&netloc).to_string()
    }
}

/// Best guess at the publisher's URL for an entry. Empty only if the link is empty.
pub fn candidate_url(entry: &RawEntry, link: &str, summary: &str) -> String {
    entry
        .source_href()
        .map(str::to_string)
        .or_else(|| embedded_url(summary))
        .or_else(|| redirect_param(link))
        .unwrap_or_else(|| percent_decode_str(link).decode_utf8_lossy().into_owned())
}

/// First absolute URL in the markup that is not on the wrapper host, else the first at all.
pub fn embedded_url(markup: &str) -> Option<String> {
    let mut urls = EMBEDDED_URL.find_iter(markup).map(|m| m.as_str());
    let first = urls.next()?;
    if !first.contains(WRAPPER_HOST) {
        return Some(first.to_string());
    }
    Some(urls.find(|u| !u.contains(WRAPPER_HOST)).unwrap_or(first).to_string())
}

/// Value of the first non-empty `url`, `u` or `q` query parameter, in that priority.
pub fn redirect_param(link: &str) -> Option<String> {
    let parsed = Url::parse(link).ok()?;
    REDIRECT_PARAMS.iter().find_map(|key| {
        parsed
            .query_pairs()
            .find(|(k, v)| k.as_ref() == *key && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    })
}

/// Lowercase host, or empty when the URL has none or does not parse.
pub fn netloc_of(url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_lowercase()))
        .unwrap_or_default()
}

pub fn is_wrapper(netloc: &str, canonical: &str) -> bool {
    netloc.contains(WRAPPER_HOST) || canonical.contains(WRAPPER_MARKER)
}

pub fn strip_www(netloc: &str) -> &str {
    netloc.strip_prefix("www.").unwrap_or(netloc)
}
