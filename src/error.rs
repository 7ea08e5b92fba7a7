use thiserror::Error;

/// Failure to retrieve or parse a single feed. The aggregator skips the feed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

/// Failure to follow a wrapper link to its destination.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("redirect resolution failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("redirect resolution timed out")]
    Timeout,
}
