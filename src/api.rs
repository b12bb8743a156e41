// src/api.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Settings;
use crate::error::EngineError;
use crate::feeds::rss::RssFeed;
use crate::feeds::{self, ArticleSource, FeedSource};
use crate::gemini::{Embedder, InsightModel};
use crate::index::VectorIndex;
use crate::memory::MemoryStore;
use crate::rate_limit::{rate_limit_mw, RateLimiter};
use crate::signals::{Signal, SignalPipeline};

pub const SERVICE_NAME: &str = "PAI Intelligence Engine";

const TEXT_MAX_CHARS: usize = 10_000;
const SEARCH_TOP_K_MAX: usize = 20;
const USER_CONTEXT_ECHO_MAX_CHARS: usize = 100;

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    embedder: Arc<dyn Embedder>,
    insight_model: Arc<dyn InsightModel>,
    memory: Arc<MemoryStore>,
    pipeline: Arc<SignalPipeline>,
    feeds: Arc<Vec<FeedSource>>,
    sources: Arc<Vec<Box<dyn ArticleSource>>>,
    limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        insight_model: Arc<dyn InsightModel>,
        feeds: Vec<FeedSource>,
    ) -> Self {
        let sources: Vec<Box<dyn ArticleSource>> = feeds
            .iter()
            .filter(|f| f.enabled)
            .cloned()
            .map(|f| Box::new(RssFeed::new(f)) as Box<dyn ArticleSource>)
            .collect();
        let limiter = Arc::new(RateLimiter::new(settings.rate_limit_requests));
        Self {
            settings: Arc::new(settings),
            embedder: embedder.clone(),
            insight_model,
            memory: Arc::new(MemoryStore::new(embedder.clone(), index.clone())),
            pipeline: Arc::new(SignalPipeline::new(embedder, index)),
            feeds: Arc::new(feeds),
            sources: Arc::new(sources),
            limiter,
        }
    }

    /// Replace the live feed fetchers (tests inject in-memory sources).
    pub fn with_sources(mut self, sources: Vec<Box<dyn ArticleSource>>) -> Self {
        self.sources = Arc::new(sources);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    let limited = Router::new()
        .route("/vectorize", post(vectorize))
        .route("/context", post(store_context))
        .route("/search", post(search_context))
        .route("/insight", post(generate_insight))
        .route("/feeds/fetch", post(fetch_feeds))
        .route("/signals", post(get_signals))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_mw,
        ));
    let open = Router::new()
        .route("/feeds", get(list_feeds))
        .route("/signals/stats", get(signal_stats));

    Router::new()
        .route("/", get(health))
        .nest("/api/v1", limited.merge(open))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Sanitize caller text: drop NUL bytes, collapse whitespace, trim. Empty or
/// oversized input is a validation failure, never coerced.
fn sanitize_text(raw: &str) -> Result<String, EngineError> {
    if raw.chars().count() > TEXT_MAX_CHARS {
        return Err(EngineError::Validation(format!(
            "text exceeds {TEXT_MAX_CHARS} characters"
        )));
    }
    let cleaned = raw.replace('\u{0}', "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return Err(EngineError::Validation(
            "text cannot be empty or whitespace only".into(),
        ));
    }
    Ok(cleaned)
}

// ---------------------------------------------------------------
// Request/response shapes
// ---------------------------------------------------------------

#[derive(Deserialize)]
struct TextInput {
    text: String,
}

#[derive(Deserialize)]
struct SearchInput {
    text: String,
    #[serde(default = "default_search_top_k")]
    top_k: usize,
}

fn default_search_top_k() -> usize {
    3
}

#[derive(Serialize)]
struct HealthConfig {
    gemini_configured: bool,
    index_configured: bool,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    config: HealthConfig,
}

#[derive(Serialize)]
struct VectorizeResponse {
    original_text: String,
    vector_dimension: usize,
    vector_preview: Vec<f32>,
}

#[derive(Serialize)]
struct ContextResponse {
    status: &'static str,
    id: String,
    message: &'static str,
}

#[derive(Serialize)]
struct MatchOut {
    id: String,
    score: f64,
    text: String,
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct SearchResponse {
    matches: Vec<MatchOut>,
    query: String,
    total_results: usize,
}

#[derive(Deserialize)]
struct FetchParams {
    #[serde(default = "default_limit_per_feed")]
    limit_per_feed: usize,
}

fn default_limit_per_feed() -> usize {
    10
}

#[derive(Serialize)]
struct FetchResponse {
    status: &'static str,
    message: String,
    fetched: usize,
    processed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sources: Vec<String>,
}

#[derive(Deserialize)]
struct SignalParams {
    #[serde(default = "default_signal_top_k")]
    top_k: i64,
    #[serde(default = "default_min_score")]
    min_score: f64,
}

fn default_signal_top_k() -> i64 {
    10
}

fn default_min_score() -> f64 {
    3.0
}

#[derive(Serialize)]
struct SignalResponse {
    signals: Vec<Signal>,
    total: usize,
    user_context: String,
}

#[derive(Serialize)]
struct StatsResponse {
    news_articles_count: u64,
    feeds_configured: usize,
    status: &'static str,
}

// ---------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "online",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        config: HealthConfig {
            gemini_configured: state.settings.gemini_configured(),
            index_configured: state.settings.index_configured(),
        },
    })
}

async fn vectorize(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> Result<Json<VectorizeResponse>, EngineError> {
    let text = sanitize_text(&input.text)?;
    let vector = state.embedder.embed(&text).await?;
    Ok(Json(VectorizeResponse {
        vector_dimension: vector.len(),
        vector_preview: vector.iter().take(5).copied().collect(),
        original_text: text,
    }))
}

async fn store_context(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> Result<Json<ContextResponse>, EngineError> {
    let text = sanitize_text(&input.text)?;
    let id = state.memory.remember(&text).await?;
    Ok(Json(ContextResponse {
        status: "success",
        id,
        message: "Context remembered.",
    }))
}

async fn search_context(
    State(state): State<AppState>,
    Json(input): Json<SearchInput>,
) -> Result<Json<SearchResponse>, EngineError> {
    let text = sanitize_text(&input.text)?;
    if input.top_k < 1 || input.top_k > SEARCH_TOP_K_MAX {
        return Err(EngineError::Validation(format!(
            "top_k must be between 1 and {SEARCH_TOP_K_MAX}"
        )));
    }

    let matches = state.memory.search(&text, input.top_k).await?;
    let total_results = matches.len();
    Ok(Json(SearchResponse {
        matches: matches
            .into_iter()
            .map(|m| MatchOut {
                id: m.id,
                score: m.similarity,
                text: m
                    .metadata
                    .get("text")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                metadata: m.metadata,
            })
            .collect(),
        query: text,
        total_results,
    }))
}

async fn generate_insight(
    State(state): State<AppState>,
    Json(input): Json<TextInput>,
) -> Result<Json<crate::memory::Insight>, EngineError> {
    let text = sanitize_text(&input.text)?;
    let insight = state
        .memory
        .insight(state.insight_model.as_ref(), &text)
        .await?;
    Ok(Json(insight))
}

async fn list_feeds(State(state): State<AppState>) -> Json<Vec<FeedSource>> {
    Json(state.feeds.as_ref().clone())
}

async fn fetch_feeds(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<FetchResponse>, EngineError> {
    let articles = feeds::fetch_all_feeds(&state.sources, params.limit_per_feed).await;

    if articles.is_empty() {
        return Ok(Json(FetchResponse {
            status: "warning",
            message: "No articles fetched from feeds".to_string(),
            fetched: 0,
            processed: 0,
            sources: Vec::new(),
        }));
    }

    let processed = state.pipeline.process_articles(&articles).await;
    let sources: BTreeSet<String> = articles.iter().map(|a| a.source.clone()).collect();

    Ok(Json(FetchResponse {
        status: "success",
        message: format!("Fetched {} articles, processed {processed}", articles.len()),
        fetched: articles.len(),
        processed,
        sources: sources.into_iter().collect(),
    }))
}

async fn get_signals(
    State(state): State<AppState>,
    Query(params): Query<SignalParams>,
    Json(input): Json<TextInput>,
) -> Result<Json<SignalResponse>, EngineError> {
    let text = sanitize_text(&input.text)?;
    if params.top_k < 1 {
        return Err(EngineError::Validation("top_k must be at least 1".into()));
    }
    if !(0.0..=10.0).contains(&params.min_score) {
        return Err(EngineError::Validation(
            "min_score must be between 0 and 10".into(),
        ));
    }

    let signals = state
        .pipeline
        .generate_signals(&text, params.top_k as usize, params.min_score)
        .await?;

    let user_context = if text.chars().count() > USER_CONTEXT_ECHO_MAX_CHARS {
        let prefix: String = text.chars().take(USER_CONTEXT_ECHO_MAX_CHARS).collect();
        format!("{prefix}...")
    } else {
        text
    };
    Ok(Json(SignalResponse {
        total: signals.len(),
        signals,
        user_context,
    }))
}

async fn signal_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    // Stats are informational; an unreachable index reads as empty.
    let news_count = match state.pipeline.news_count().await {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "news count unavailable");
            0
        }
    };
    Json(StatsResponse {
        news_articles_count: news_count,
        feeds_configured: state.feeds.len(),
        status: if news_count > 0 { "ready" } else { "empty" },
    })
}
