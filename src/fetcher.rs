use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use feed_rs::parser;
use reqwest::Client;
use tracing::{error, info, warn};

use crate::article::Article;
use crate::config::Config;
use crate::entry::{scan_item_extras, RawEntry};
use crate::error::FetchError;
use crate::extractor::Extractor;
use crate::registry::FeedRegistry;
use crate::resolver::{HttpResolver, ResolutionCache};

/// Retrieves and parses a single syndication document.
pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, endpoint: &str) -> Result<Vec<RawEntry>, FetchError> {
        info!("Fetching feed: {}", endpoint);

        let response = self.client.get(endpoint).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;

        parse_entries(&bytes)
    }
}

/// Parse an RSS/Atom document, keeping the raw fields `feed_rs` drops.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>, FetchError> {
    let extras = scan_item_extras(bytes);
    let parsed = parser::parse(bytes)?;

    let entries = parsed
        .entries
        .iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.trim());
            RawEntry::from_parsed(entry, link.and_then(|l| extras.get(l)))
        })
        .collect();

    Ok(entries)
}

/// Runs the extractor over every registered feed and merges the results.
pub struct Aggregator {
    registry: FeedRegistry,
    fetcher: FeedFetcher,
    extractor: Extractor,
}

impl Aggregator {
    pub fn new(registry: FeedRegistry, fetcher: FeedFetcher, extractor: Extractor) -> Self {
        Self {
            registry,
            fetcher,
            extractor,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher = FeedFetcher::new(&config.user_agent, config.fetch_timeout())?;
        let resolver = HttpResolver::new(&config.user_agent, config.resolve_timeout())?;
        let extractor = Extractor::new(
            &config.keywords,
            config.publisher_table(),
            Arc::new(resolver),
        );

        Ok(Self::new(config.registry(), fetcher, extractor))
    }

    pub fn registry(&self) -> &FeedRegistry {
        &self.registry
    }

    pub fn labels(&self) -> Vec<String> {
        self.registry.labels()
    }

    /// One full run with its own resolution cache.
    pub async fn aggregate_all(&self) -> Vec<Article> {
        let cache = ResolutionCache::new();
        self.aggregate_with_cache(&cache).await
    }

    /// Registry order, then entry order; the first article seen for a URL wins.
    /// A feed that cannot be fetched or parsed is skipped.
    pub async fn aggregate_with_cache(&self, cache: &ResolutionCache) -> Vec<Article> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();

        for source in self.registry.sources() {
            let entries = match self.fetcher.fetch(&source.endpoint).await {
                Ok(entries) => entries,
                Err(e) => {
                    error!("Failed to fetch feed '{}': {}", source.label, e);
                    continue;
                }
            };

            let articles = self.extractor.extract(&source.label, entries, cache).await;
            let mut added = 0;
            for article in articles {
                if article.url.is_empty() {
                    warn!("Skipping entry with no link: {}", article.title);
                    continue;
                }
                if seen.insert(article.url.clone()) {
                    results.push(article);
                    added += 1;
                }
            }

            info!("Added {} articles from feed '{}'", added, source.label);
        }

        info!("Aggregation complete: {} articles", results.len());
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PublisherTable;
    use crate::error::ResolveError;
    use crate::registry::FeedSource;
    use crate::resolver::RedirectResolver;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct TimeoutResolver;

    #[async_trait]
    impl RedirectResolver for TimeoutResolver {
        async fn resolve(&self, _url: &str) -> Result<String, ResolveError> {
            Err(ResolveError::Timeout)
        }
    }

    fn rss(items: &[(&str, &str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(title, link, description)| {
                format!(
                    "<item><title>{}</title><link>{}</link><description>{}</description></item>",
                    title, link, description
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Feed</title><link>https://feed.example</link><description>d</description>{}</channel></rss>"#,
            body
        )
    }

    fn create_aggregator(sources: Vec<FeedSource>) -> Aggregator {
        let fetcher = FeedFetcher::new("newsbridge-test/1.0", Duration::from_secs(5)).unwrap();
        let extractor = Extractor::new(
            &["china".to_string(), "chinese".to_string()],
            PublisherTable::builtin(),
            Arc::new(TimeoutResolver),
        );
        Aggregator::new(FeedRegistry::new(sources), fetcher, extractor)
    }

    async fn mount_feed(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    mod parse_entries_tests {
        use super::*;

        #[test]
        fn test_parse_google_news_item() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0">
                    <channel>
                        <title>"China" - Google News</title>
                        <link>https://news.google.com</link>
                        <description>Google News</description>
                        <item>
                            <title>China trade talks resume - Reuters</title>
                            <link>https://news.google.com/rss/articles/CBMiXyz?oc=5</link>
                            <pubDate>Tue, 10 Dec 2024 08:00:00 GMT</pubDate>
                            <description>&lt;a href="https://news.google.com/rss/articles/CBMiXyz?oc=5"&gt;China trade talks resume&lt;/a&gt;</description>
                            <source url="https://www.reuters.com">Reuters</source>
                        </item>
                    </channel>
                </rss>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();

            assert_eq!(entries.len(), 1);
            let entry = &entries[0];
            assert_eq!(entry.title.as_deref(), Some("China trade talks resume - Reuters"));
            assert_eq!(
                entry.link.as_deref(),
                Some("https://news.google.com/rss/articles/CBMiXyz?oc=5")
            );
            assert_eq!(entry.published.as_deref(), Some("Tue, 10 Dec 2024 08:00:00 GMT"));
            assert_eq!(entry.source_href(), Some("https://www.reuters.com"));
            assert!(entry.summary.as_deref().unwrap().contains("<a href="));
        }

        #[test]
        fn test_parse_atom_feed() {
            let xml = r#"<?xml version="1.0" encoding="utf-8"?>
                <feed xmlns="http://www.w3.org/2005/Atom">
                    <title>Atom</title>
                    <id>urn:feed</id>
                    <updated>2024-12-10T08:00:00Z</updated>
                    <entry>
                        <title>Chinese exports rise</title>
                        <id>urn:entry:1</id>
                        <link href="https://www.bloomberg.com/news/1"/>
                        <published>2024-12-10T08:00:00Z</published>
                        <updated>2024-12-11T09:30:00Z</updated>
                        <summary>Exports up</summary>
                    </entry>
                </feed>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();

            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].link.as_deref(), Some("https://www.bloomberg.com/news/1"));
            assert_eq!(entries[0].summary.as_deref(), Some("Exports up"));
            assert_eq!(entries[0].published.as_deref(), Some("2024-12-10T08:00:00Z"));
            assert_eq!(entries[0].source, None);
        }

        #[test]
        fn test_parse_keeps_source_with_entity_encoded_link() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0">
                    <channel>
                        <title>Google News</title>
                        <link>https://news.google.com</link>
                        <description>Google News</description>
                        <item xml:lang="en">
                            <title>China trade talks resume - Reuters</title>
                            <link>https://news.google.com/rss/articles/CBMiXyz?hl=en-US&#38;oc=5</link>
                            <pubDate>Tue, 10 Dec 2024 08:00:00 GMT</pubDate>
                            <source url="https://www.reuters.com">Reuters</source>
                        </item>
                    </channel>
                </rss>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();

            assert_eq!(
                entries[0].link.as_deref(),
                Some("https://news.google.com/rss/articles/CBMiXyz?hl=en-US&oc=5")
            );
            assert_eq!(entries[0].source_href(), Some("https://www.reuters.com"));
            assert_eq!(entries[0].published.as_deref(), Some("Tue, 10 Dec 2024 08:00:00 GMT"));
        }

        #[test]
        fn test_parse_duplicate_links_keep_first_item_extras() {
            let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0">
                    <channel>
                        <title>Feed</title>
                        <link>https://feed.example</link>
                        <description>d</description>
                        <item>
                            <title>China first</title>
                            <link>https://example.com/same</link>
                            <source url="https://www.reuters.com">Reuters</source>
                        </item>
                        <item>
                            <title>China second</title>
                            <link>https://example.com/same</link>
                            <source url="https://apnews.com">AP</source>
                        </item>
                    </channel>
                </rss>
            "#;

            let entries = parse_entries(xml.as_bytes()).unwrap();

            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].source_href(), Some("https://www.reuters.com"));
        }

        #[test]
        fn test_parse_malformed_feed() {
            let result = parse_entries(b"this is not a feed");
            assert!(matches!(result, Err(FetchError::Parse(_))));
        }
    }

    mod fetch_tests {
        use super::*;

        #[tokio::test]
        async fn test_fetch_parses_entries() {
            let server = MockServer::start().await;
            mount_feed(
                &server,
                "/rss",
                rss(&[("China", "https://edition.cnn.com/a", "")]),
            )
            .await;

            let fetcher = FeedFetcher::new("newsbridge-test/1.0", Duration::from_secs(5)).unwrap();
            let entries = fetcher.fetch(&format!("{}/rss", server.uri())).await.unwrap();

            assert_eq!(entries.len(), 1);
        }

        #[tokio::test]
        async fn test_fetch_http_error_status() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let fetcher = FeedFetcher::new("newsbridge-test/1.0", Duration::from_secs(5)).unwrap();
            let result = fetcher.fetch(&server.uri()).await;

            assert!(matches!(result, Err(FetchError::Http(_))));
        }
    }

    mod aggregate_tests {
        use super::*;

        #[tokio::test]
        async fn test_registry_order_and_dedup() {
            let server = MockServer::start().await;
            mount_feed(
                &server,
                "/cnn",
                rss(&[
                    ("China one", "https://edition.cnn.com/one", ""),
                    ("Sports", "https://edition.cnn.com/sports", ""),
                    ("China two", "https://edition.cnn.com/two", ""),
                ]),
            )
            .await;
            mount_feed(
                &server,
                "/bbc",
                rss(&[
                    ("China one again", "https://edition.cnn.com/one", ""),
                    ("Chinese art", "https://www.bbc.co.uk/news/art", ""),
                ]),
            )
            .await;

            let aggregator = create_aggregator(vec![
                FeedSource::new("CNN", &format!("{}/cnn", server.uri())),
                FeedSource::new("BBC", &format!("{}/bbc", server.uri())),
            ]);

            let articles = aggregator.aggregate_all().await;
            let urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();

            assert_eq!(
                urls,
                vec![
                    "https://edition.cnn.com/one",
                    "https://edition.cnn.com/two",
                    "https://www.bbc.co.uk/news/art",
                ]
            );
            assert_eq!(articles[0].title, "China one");
            assert_eq!(articles[0].feed_source, "CNN");
            assert_eq!(articles[2].source, "BBC");
            assert_eq!(articles[2].feed_source, "BBC");
        }

        #[tokio::test]
        async fn test_failing_feeds_are_skipped() {
            let server = MockServer::start().await;
            mount_feed(
                &server,
                "/good",
                rss(&[("China", "https://apnews.com/article/1", "")]),
            )
            .await;
            Mock::given(method("GET"))
                .and(path("/broken"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope"))
                .mount(&server)
                .await;

            let aggregator = create_aggregator(vec![
                FeedSource::new("Down", "http://127.0.0.1:1/rss"),
                FeedSource::new("Broken", &format!("{}/broken", server.uri())),
                FeedSource::new("Good", &format!("{}/good", server.uri())),
            ]);

            let articles = aggregator.aggregate_all().await;

            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0].source, "AP News");
            assert_eq!(articles[0].feed_source, "Good");
        }

        #[tokio::test]
        async fn test_entries_without_link_are_dropped() {
            let server = MockServer::start().await;
            mount_feed(
                &server,
                "/rss",
                rss(&[
                    ("China no link", "", ""),
                    ("China linked", "https://www.politico.com/a", ""),
                ]),
            )
            .await;

            let aggregator =
                create_aggregator(vec![FeedSource::new("P", &format!("{}/rss", server.uri()))]);

            let articles = aggregator.aggregate_all().await;

            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0].source, "Politico");
        }

        #[tokio::test]
        async fn test_entity_encoded_wrapper_link_classified_by_source() {
            let server = MockServer::start().await;
            let body = r#"<?xml version="1.0" encoding="UTF-8"?>
                <rss version="2.0"><channel><title>Google News</title>
                <link>https://news.google.com</link><description>d</description>
                <item xml:lang="en">
                    <title>China trade talks resume - Reuters</title>
                    <link>https://news.google.com/rss/articles/CBMiXyz?hl=en-US&#38;oc=5</link>
                    <source url="https://www.reuters.com">Reuters</source>
                </item>
                </channel></rss>"#;
            mount_feed(&server, "/google", body.to_string()).await;

            let aggregator = create_aggregator(vec![FeedSource::new(
                "Google News",
                &format!("{}/google", server.uri()),
            )]);

            let articles = aggregator.aggregate_all().await;

            assert_eq!(articles.len(), 1);
            assert_eq!(articles[0].source, "Reuters");
            assert_eq!(articles[0].feed_source, "Google News");
        }

        #[tokio::test]
        async fn test_empty_registry() {
            let aggregator = create_aggregator(Vec::new());
            assert!(aggregator.aggregate_all().await.is_empty());
            assert!(aggregator.labels().is_empty());
        }
    }
}
