//! PAI Intelligence Engine — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pai_intelligence_engine::api::{self, AppState, SERVICE_NAME};
use pai_intelligence_engine::config::Settings;
use pai_intelligence_engine::feeds;
use pai_intelligence_engine::gemini::GeminiClient;
use pai_intelligence_engine::index::PineconeIndex;
use pai_intelligence_engine::metrics::Metrics;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PAI_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PAI_DEV_LOG").ok().is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pai_intelligence_engine=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // GOOGLE_API_KEY / PINECONE_* / FEEDS_CONFIG_PATH from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let settings = Settings::from_env();
    tracing::info!(
        service = SERVICE_NAME,
        env = %settings.app_env,
        gemini_configured = settings.gemini_configured(),
        index_configured = settings.index_configured(),
        "starting up"
    );

    // Process-wide collaborator clients, shared across in-flight requests.
    let gemini = Arc::new(GeminiClient::new(settings.google_api_key.clone()));
    let index = Arc::new(PineconeIndex::new(
        settings.pinecone_host.clone(),
        settings.pinecone_api_key.clone(),
    ));

    let feed_list = feeds::load_feeds_default().expect("Failed to load feeds config");

    let metrics = Metrics::init(settings.rate_limit_requests);

    let state = AppState::new(settings, gemini.clone(), index, gemini, feed_list);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
