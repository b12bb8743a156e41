// src/gemini.rs
//! Gemini client: text embeddings and insight generation over REST.
//!
//! Both capabilities sit behind object-safe traits so handlers and tests can
//! substitute doubles without touching global state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EngineError;

/// Dimensionality of the embedding vectors (text-embedding-004).
pub const EMBEDDING_DIM: usize = 768;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const EMBED_MODEL: &str = "text-embedding-004";
const GENERATION_MODEL: &str = "gemini-3-flash-preview";

/// Text → fixed-length vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one text. Inputs up to 8000 chars pass through untruncated;
    /// longer inputs are the caller's responsibility to cap.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError>;

    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

/// Prompt → generated text, for RAG insights.
#[async_trait]
pub trait InsightModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError>;

    /// Model identifier reported in responses.
    fn model_name(&self) -> &str;
}

/// Gemini REST client implementing both traits.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("pai-intelligence-engine/0.2")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different host (stub servers in integration
    /// environments).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: String,
            content: Content<'a>,
        }
        #[derive(Deserialize)]
        struct Resp {
            embedding: Embedding,
        }
        #[derive(Deserialize)]
        struct Embedding {
            #[serde(default)]
            values: Vec<f32>,
        }

        if self.api_key.is_empty() {
            return Err(EngineError::Embedding("no API key configured".into()));
        }

        let url = format!(
            "{}/v1beta/models/{}:embedContent?key={}",
            self.base_url, EMBED_MODEL, self.api_key
        );
        let req = Req {
            model: format!("models/{EMBED_MODEL}"),
            content: Content {
                parts: vec![Part { text }],
            },
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(format!("request error: {e}")))?;
        if !resp.status().is_success() {
            return Err(EngineError::Embedding(format!(
                "provider returned {}",
                resp.status()
            )));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| EngineError::Embedding(format!("bad response body: {e}")))?;

        let values = body.embedding.values;
        if values.is_empty() {
            return Err(EngineError::Embedding("provider returned no vector".into()));
        }
        if values.len() != EMBEDDING_DIM {
            return Err(EngineError::Embedding(format!(
                "provider returned {} dimensions, expected {EMBEDDING_DIM}",
                values.len()
            )));
        }
        tracing::debug!(dims = values.len(), "embedding generated");
        Ok(values)
    }
}

#[async_trait]
impl InsightModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, EngineError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: CandidateContent,
        }
        #[derive(Deserialize)]
        struct CandidateContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        if self.api_key.is_empty() {
            return Err(EngineError::Generation("no API key configured".into()));
        }

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, GENERATION_MODEL, self.api_key
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .map_err(|e| EngineError::Generation(format!("request error: {e}")))?;
        if !resp.status().is_success() {
            return Err(EngineError::Generation(format!(
                "provider returned {}",
                resp.status()
            )));
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(|e| EngineError::Generation(format!("bad response body: {e}")))?;

        let text = body
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.is_empty() {
            return Err(EngineError::Generation("provider returned no text".into()));
        }
        tracing::debug!(model = GENERATION_MODEL, "insight generated");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        GENERATION_MODEL
    }
}
