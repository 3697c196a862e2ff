//! News aggregation service: binary entrypoint.
//! Boots the Axum HTTP server with the shared news cache behind `/api/news`.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compact logs filtered by `RUST_LOG` (default `news=info,warn`).
/// The runtime may already have a subscriber installed; that one wins.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("news=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let router = news_aggregator::app().await?;

    Ok(router.into())
}
