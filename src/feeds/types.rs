// src/feeds/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized news article from an RSS/web source.
///
/// The id is content-derived (hash of the canonical URL), so re-fetching the
/// same URL yields the same id and re-ingestion overwrites instead of
/// duplicating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewsArticle {
    pub id: String,
    pub title: String,
    pub url: String,
    /// Source name, e.g. "TechCrunch".
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Provider-specific extras; the canonical fields above stay typed.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl NewsArticle {
    /// Stable, content-derived article id: first 32 hex chars of sha256(url).
    pub fn id_for_url(url: &str) -> String {
        let digest = Sha256::digest(url.as_bytes());
        let mut out = String::with_capacity(32);
        for b in digest.iter().take(16) {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        out
    }
}

/// RSS/Atom feed source configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_category() -> String {
    "tech".to_string()
}

fn default_enabled() -> bool {
    true
}

/// A feed-of-articles collaborator. Implementations fetch and normalize;
/// callers never see raw feed XML.
#[async_trait::async_trait]
pub trait ArticleSource: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<NewsArticle>>;
    fn name(&self) -> &str;
}
