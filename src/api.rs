use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::news::cache::CacheManager;
use crate::news::query::{build_response, NewsQuery, NewsQueryParams};

pub const ENV_DEBUG_ROUTES: &str = "DEBUG_ROUTES";

#[derive(Clone)]
pub struct AppState {
    pub news: Arc<CacheManager>,
}

impl AppState {
    pub fn new(news: CacheManager) -> Self {
        Self {
            news: Arc::new(news),
        }
    }
}

/// Public routes only. See [`router_with_metrics`] for the `/metrics` variant.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/news", get(get_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

pub fn router_with_metrics(state: AppState, metrics: &Metrics) -> Router {
    router(state).merge(metrics.router())
}

/// `DEBUG_ROUTES=1` mounts diagnostics routes.
pub fn debug_routes_enabled() -> bool {
    std::env::var(ENV_DEBUG_ROUTES).ok().as_deref() == Some("1")
}

async fn get_news(
    State(state): State<AppState>,
    Query(params): Query<NewsQueryParams>,
) -> impl IntoResponse {
    let query = NewsQuery::from(params);
    let snapshot = state.news.snapshot().await;
    let ttl = state.news.ttl();
    let body = build_response(&snapshot, state.news.sources(), ttl, &query);

    tracing::debug!(
        target: "news",
        total = body.total,
        failures = body.failures.len(),
        region = ?query.region,
        "served /api/news"
    );

    let cache_control = format!(
        "s-maxage={}, stale-while-revalidate={}",
        ttl.as_secs(),
        ttl.as_secs() / 2
    );
    ([(header::CACHE_CONTROL, cache_control)], Json(body))
}
