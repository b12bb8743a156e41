// tests/helpers/mod.rs
// Shared test doubles: deterministic embedder, in-memory vector index, and a
// canned insight model. No network, no global state.

// Each integration test binary compiles this module and uses a subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pai_intelligence_engine::api::AppState;
use pai_intelligence_engine::config::Settings;
use pai_intelligence_engine::error::EngineError;
use pai_intelligence_engine::gemini::{Embedder, InsightModel};
use pai_intelligence_engine::index::{IndexMatch, IndexStats, VectorIndex};

/// Embedder returning canned vectors per exact input text, with a
/// deterministic fallback for anything unlisted.
pub struct StaticEmbedder {
    canned: HashMap<String, Vec<f32>>,
}

impl StaticEmbedder {
    pub fn new() -> Self {
        Self {
            canned: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.canned.insert(text.to_string(), vector);
        self
    }
}

#[async_trait]
impl Embedder for StaticEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EngineError> {
        if let Some(v) = self.canned.get(text) {
            return Ok(v.clone());
        }
        // Deterministic fallback: direction derived from the text bytes.
        let seed = text.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        let x = (seed % 1000) as f32 / 1000.0;
        let y = (1.0 - x * x).max(0.0).sqrt();
        Ok(vec![x, y, 0.0])
    }
}

/// Embedder that always fails, for typed-failure tests.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EngineError> {
        Err(EngineError::Embedding("provider unreachable".into()))
    }
}

/// In-memory vector index with real cosine-similarity queries.
#[derive(Default)]
pub struct InMemoryIndex {
    records: Mutex<HashMap<(String, String), (Vec<f32>, Map<String, Value>)>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let na: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let nb: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: &[f32],
        metadata: Map<String, Value>,
    ) -> Result<(), EngineError> {
        self.records.lock().unwrap().insert(
            (namespace.to_string(), id.to_string()),
            (values.to_vec(), metadata),
        );
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        values: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, EngineError> {
        let records = self.records.lock().unwrap();
        let mut matches: Vec<IndexMatch> = records
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, id), (vector, metadata))| IndexMatch {
                id: id.clone(),
                similarity: cosine(values, vector),
                metadata: if include_metadata {
                    metadata.clone()
                } else {
                    Map::new()
                },
            })
            .collect();
        matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn stats(&self, namespace: &str) -> Result<IndexStats, EngineError> {
        let count = self
            .records
            .lock()
            .unwrap()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .count() as u64;
        Ok(IndexStats { count })
    }
}

/// Index double that answers every query with a fixed match list.
pub struct CannedIndex {
    matches: Vec<IndexMatch>,
}

impl CannedIndex {
    pub fn new(matches: Vec<IndexMatch>) -> Self {
        Self { matches }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VectorIndex for CannedIndex {
    async fn upsert(
        &self,
        _namespace: &str,
        _id: &str,
        _values: &[f32],
        _metadata: Map<String, Value>,
    ) -> Result<(), EngineError> {
        Ok(())
    }

    async fn query(
        &self,
        _namespace: &str,
        _values: &[f32],
        top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, EngineError> {
        let mut out = self.matches.clone();
        out.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        out.truncate(top_k);
        Ok(out)
    }

    async fn stats(&self, _namespace: &str) -> Result<IndexStats, EngineError> {
        Ok(IndexStats {
            count: self.matches.len() as u64,
        })
    }
}

/// Index double that always fails, for typed-failure tests.
pub struct FailingIndex;

#[async_trait]
impl VectorIndex for FailingIndex {
    async fn upsert(
        &self,
        _namespace: &str,
        _id: &str,
        _values: &[f32],
        _metadata: Map<String, Value>,
    ) -> Result<(), EngineError> {
        Err(EngineError::Index("index unreachable".into()))
    }

    async fn query(
        &self,
        _namespace: &str,
        _values: &[f32],
        _top_k: usize,
        _include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, EngineError> {
        Err(EngineError::Index("index unreachable".into()))
    }

    async fn stats(&self, _namespace: &str) -> Result<IndexStats, EngineError> {
        Err(EngineError::Index("index unreachable".into()))
    }
}

/// Insight model double echoing a fixed reply.
pub struct StaticInsightModel {
    pub reply: String,
}

#[async_trait]
impl InsightModel for StaticInsightModel {
    async fn generate(&self, _prompt: &str) -> Result<String, EngineError> {
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "static-test-model"
    }
}

pub fn test_settings() -> Settings {
    Settings {
        google_api_key: "test-key".to_string(),
        pinecone_api_key: "test-key".to_string(),
        pinecone_host: "http://localhost:9".to_string(),
        app_env: "test".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        rate_limit_requests: 100,
    }
}

/// AppState wired to doubles; no live feed fetchers.
pub fn test_state(
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
) -> AppState {
    AppState::new(
        test_settings(),
        embedder,
        index,
        Arc::new(StaticInsightModel {
            reply: "Sounds like a plan.".to_string(),
        }),
        vec![],
    )
    .with_sources(vec![])
}
