use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::article::Article;
use crate::fetcher::Aggregator;
use crate::resolver::ResolutionCache;

pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    /// Lives as long as the process. Entries never expire or get evicted, so
    /// the map grows by one entry per distinct wrapper link ever resolved.
    pub cache: Arc<ResolutionCache>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            cache: Arc::new(ResolutionCache::new()),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/news", get(news))
        .route("/api/sources", get(sources))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct NewsQuery {
    /// Keep only articles from this detected publisher
    #[serde(default)]
    pub source: Option<String>,
    /// Case-insensitive text search over title and summary
    #[serde(default)]
    pub q: Option<String>,
}

impl NewsQuery {
    pub fn matches(&self, article: &Article) -> bool {
        if let Some(source) = self.source.as_deref().filter(|s| !s.is_empty()) {
            if article.source != source {
                return false;
            }
        }
        if let Some(q) = self.q.as_deref().filter(|q| !q.is_empty()) {
            let haystack = format!("{} {}", article.title, article.summary).to_lowercase();
            if !haystack.contains(&q.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

// Route handlers
pub async fn news(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NewsQuery>,
) -> Json<Vec<Article>> {
    let articles = state.aggregator.aggregate_with_cache(&state.cache).await;
    Json(articles.into_iter().filter(|a| query.matches(a)).collect())
}

pub async fn sources(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.aggregator.labels())
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
