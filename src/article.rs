use serde::{Deserialize, Serialize};

/// A relevant, enriched item ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    /// The entry's own link; unique within one aggregation run.
    pub url: String,
    /// May contain markup from the feed.
    pub summary: String,
    /// As written by the feed, not normalized.
    pub published: String,
    /// Detected publisher.
    pub source: String,
    /// Registry label of the feed the item came through.
    pub feed_source: String,
}
