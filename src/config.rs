use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::classify::{PublisherRule, PublisherTable};
use crate::registry::{FeedRegistry, FeedSource};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Case-insensitive relevance keywords
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    /// Per-feed retrieval timeout in seconds
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Per-link redirect resolution timeout in seconds
    #[serde(default = "default_resolve_timeout")]
    pub resolve_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
    /// Extra classification rules on top of the built-in table
    #[serde(default)]
    pub publishers: Vec<PublisherRule>,
}

fn default_keywords() -> Vec<String> {
    vec!["china".to_string(), "chinese".to_string()]
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_resolve_timeout() -> u64 {
    6
}

fn default_user_agent() -> String {
    "newsbridge/1.0".to_string()
}

fn default_feeds() -> Vec<FeedSource> {
    FeedRegistry::builtin().sources().to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            fetch_timeout_secs: default_fetch_timeout(),
            resolve_timeout_secs: default_resolve_timeout(),
            user_agent: default_user_agent(),
            feeds: default_feeds(),
            publishers: Vec::new(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    pub fn registry(&self) -> FeedRegistry {
        FeedRegistry::new(self.feeds.clone())
    }

    pub fn publisher_table(&self) -> PublisherTable {
        let mut table = PublisherTable::builtin();
        table.extend(self.publishers.iter().cloned());
        table
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }
}
