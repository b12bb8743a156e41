// src/index.rs
//! Similarity index client (Pinecone-style REST).
//!
//! The index stores (id, vector, metadata) tuples in named namespaces and
//! answers top-K nearest-neighbor queries by cosine similarity. Metadata is a
//! schema-less bag only at this boundary; everything internal stays typed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::EngineError;

/// Namespace holding user memories/contexts.
pub const DEFAULT_NAMESPACE: &str = "";

/// One nearest-neighbor match. `similarity` is the raw cosine score in [0,1]
/// as the index reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch {
    pub id: String,
    pub similarity: f64,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    pub count: u64,
}

/// Vector store collaborator: idempotent upsert, top-K query, stats.
///
/// Failures are errors distinguishable from "zero results". The client is
/// process-wide and safe for concurrent use; the service behind it handles
/// its own concurrency control.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or overwrite the entry with this id in this namespace.
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: &[f32],
        metadata: Map<String, Value>,
    ) -> Result<(), EngineError>;

    /// Top-K nearest neighbors, ordered by similarity descending.
    async fn query(
        &self,
        namespace: &str,
        values: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, EngineError>;

    async fn stats(&self, namespace: &str) -> Result<IndexStats, EngineError>;
}

/// REST client for a Pinecone-compatible index host.
pub struct PineconeIndex {
    http: reqwest::Client,
    host: String,
    api_key: String,
}

impl PineconeIndex {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("pai-intelligence-engine/0.2")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .expect("reqwest client");
        Self {
            http,
            host: host.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty() && !self.api_key.is_empty()
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, EngineError> {
        if !self.is_configured() {
            return Err(EngineError::Index("index host/key not configured".into()));
        }
        let url = format!("{}{path}", self.host);
        let resp = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| EngineError::Index(format!("request error: {e}")))?;
        if !resp.status().is_success() {
            return Err(EngineError::Index(format!(
                "index returned {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| EngineError::Index(format!("bad response body: {e}")))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn upsert(
        &self,
        namespace: &str,
        id: &str,
        values: &[f32],
        metadata: Map<String, Value>,
    ) -> Result<(), EngineError> {
        #[derive(Serialize)]
        struct Vector<'a> {
            id: &'a str,
            values: &'a [f32],
            metadata: Map<String, Value>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            vectors: Vec<Vector<'a>>,
            namespace: &'a str,
        }
        let _: Value = self
            .post_json(
                "/vectors/upsert",
                &Req {
                    vectors: vec![Vector {
                        id,
                        values,
                        metadata,
                    }],
                    namespace,
                },
            )
            .await?;
        tracing::debug!(id, namespace, "vector upserted");
        Ok(())
    }

    async fn query(
        &self,
        namespace: &str,
        values: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<IndexMatch>, EngineError> {
        #[derive(Serialize)]
        struct Req<'a> {
            vector: &'a [f32],
            #[serde(rename = "topK")]
            top_k: usize,
            #[serde(rename = "includeMetadata")]
            include_metadata: bool,
            namespace: &'a str,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            matches: Vec<RespMatch>,
        }
        #[derive(Deserialize)]
        struct RespMatch {
            id: String,
            #[serde(default)]
            score: f64,
            #[serde(default)]
            metadata: Map<String, Value>,
        }

        let body: Resp = self
            .post_json(
                "/query",
                &Req {
                    vector: values,
                    top_k,
                    include_metadata,
                    namespace,
                },
            )
            .await?;
        Ok(body
            .matches
            .into_iter()
            .map(|m| IndexMatch {
                id: m.id,
                similarity: m.score,
                metadata: m.metadata,
            })
            .collect())
    }

    async fn stats(&self, namespace: &str) -> Result<IndexStats, EngineError> {
        #[derive(Serialize)]
        struct Req {}
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            namespaces: Map<String, Value>,
        }

        let body: Resp = self.post_json("/describe_index_stats", &Req {}).await?;
        let count = body
            .namespaces
            .get(namespace)
            .and_then(|ns| ns.get("vectorCount"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        Ok(IndexStats { count })
    }
}
