//! Newsbridge - topic news aggregation
//!
//! Fetches a fixed list of RSS/Atom feeds, keeps the entries that mention the
//! configured keywords, unwraps aggregator links, attributes each item to its
//! publisher and returns a deduplicated list of articles.

pub mod article;
pub mod classify;
pub mod config;
pub mod entry;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod registry;
pub mod resolver;
pub mod routes;

pub use article::Article;
pub use fetcher::Aggregator;
pub use registry::{FeedRegistry, FeedSource};
pub use resolver::ResolutionCache;
