// src/signals/mod.rs
//! Signal ranking pipeline: embed the user context, query the news
//! namespace, map similarity to a 0-10 score, filter, rank, truncate.
//! Also owns the ingestion side that gives the pipeline candidates to rank.

pub mod score;

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::EngineError;
use crate::feeds::NewsArticle;
use crate::gemini::Embedder;
use crate::index::VectorIndex;
use score::{round_score, round_similarity, similarity_to_score};

/// Index namespace holding news article vectors.
pub const NEWS_NAMESPACE: &str = "news";

/// Cap on embeddable text, below the provider's input limit.
const EMBED_TEXT_MAX_CHARS: usize = 8000;
// Stored metadata is a bounded projection of the article.
const META_TITLE_MAX_CHARS: usize = 500;
const META_SUMMARY_MAX_CHARS: usize = 1000;

/// A scored news item surfaced to the user as relevant to their context.
/// Created per ranking request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub article: NewsArticle,
    /// Relevance score in [0,10], one decimal.
    pub score: f64,
    /// Raw cosine similarity in [0,1] as reported by the index, three
    /// decimals.
    pub similarity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("signals_generated_total", "Signals returned to callers.");
        describe_counter!("signals_ingested_total", "Articles embedded and stored.");
        describe_counter!(
            "signals_ingest_errors_total",
            "Articles dropped during ingestion."
        );
    });
}

/// The ranking pipeline with its injected collaborators.
pub struct SignalPipeline {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl SignalPipeline {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embeddable text for an article: title + blank line + summary, capped
    /// to respect provider input limits.
    fn embed_text(article: &NewsArticle) -> String {
        truncate_chars(
            &format!("{}\n\n{}", article.title, article.summary),
            EMBED_TEXT_MAX_CHARS,
        )
    }

    /// Embed one article and upsert it into the news namespace under its
    /// content-derived id. Re-ingesting the same article overwrites.
    pub async fn ingest_article(&self, article: &NewsArticle) -> Result<(), EngineError> {
        let values = self.embedder.embed(&Self::embed_text(article)).await?;

        let mut metadata = Map::new();
        metadata.insert(
            "title".into(),
            truncate_chars(&article.title, META_TITLE_MAX_CHARS).into(),
        );
        metadata.insert("url".into(), article.url.clone().into());
        metadata.insert("source".into(), article.source.clone().into());
        metadata.insert(
            "summary".into(),
            truncate_chars(&article.summary, META_SUMMARY_MAX_CHARS).into(),
        );
        if let Some(ts) = article.published_at {
            metadata.insert("published_at".into(), ts.to_rfc3339().into());
        }
        metadata.insert("type".into(), "news".into());

        self.index
            .upsert(NEWS_NAMESPACE, &article.id, &values, metadata)
            .await
    }

    /// Best-effort batch ingestion: each article is processed independently,
    /// failures are logged and skipped. Returns the success count.
    pub async fn process_articles(&self, articles: &[NewsArticle]) -> usize {
        ensure_metrics_described();

        let mut ok = 0usize;
        for article in articles {
            match self.ingest_article(article).await {
                Ok(()) => ok += 1,
                Err(e) => {
                    tracing::warn!(error = %e, article_id = %article.id, "article ingest failed");
                    counter!("signals_ingest_errors_total").increment(1);
                }
            }
        }
        counter!("signals_ingested_total").increment(ok as u64);
        tracing::info!(ok, total = articles.len(), "article batch processed");
        ok
    }

    /// Rank stored news against `user_context`.
    ///
    /// `Ok(empty)` means nothing matched; collaborator failures come back as
    /// `Err(EngineError::Embedding | Index)` so callers can tell "no relevant
    /// items" from "the system is broken". Returns at most `top_k` signals,
    /// each with score >= `min_score`, sorted by score descending; ties break
    /// by freshest publication date, then id.
    pub async fn generate_signals(
        &self,
        user_context: &str,
        top_k: usize,
        min_score: f64,
    ) -> Result<Vec<Signal>, EngineError> {
        ensure_metrics_described();

        let user_embedding = self.embedder.embed(user_context).await?;

        // Over-fetch so min_score filtering still leaves enough candidates.
        let matches = self
            .index
            .query(NEWS_NAMESPACE, &user_embedding, top_k * 2, true)
            .await?;

        let mut signals: Vec<Signal> = Vec::with_capacity(matches.len());
        for m in matches {
            let raw_score = similarity_to_score(m.similarity);
            if raw_score < min_score {
                continue;
            }
            signals.push(Signal {
                article: article_from_metadata(&m.id, &m.metadata),
                score: round_score(raw_score),
                similarity: round_similarity(m.similarity),
                reason: None,
            });
        }

        signals.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.article.published_at.cmp(&a.article.published_at))
                .then_with(|| a.article.id.cmp(&b.article.id))
        });
        signals.truncate(top_k);

        counter!("signals_generated_total").increment(signals.len() as u64);
        tracing::info!(count = signals.len(), "signals generated");
        Ok(signals)
    }

    /// Number of news articles currently stored.
    pub async fn news_count(&self) -> Result<u64, EngineError> {
        Ok(self.index.stats(NEWS_NAMESPACE).await?.count)
    }
}

/// Rebuild the article view from the metadata projection stored next to the
/// vector. Missing or malformed fields fall back to defaults; this never
/// fails.
fn article_from_metadata(id: &str, meta: &Map<String, Value>) -> NewsArticle {
    let text = |key: &str| {
        meta.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let title = match meta.get("title").and_then(Value::as_str) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => "Untitled".to_string(),
    };
    let source = match meta.get("source").and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "Unknown".to_string(),
    };
    NewsArticle {
        id: id.to_string(),
        title,
        url: text("url"),
        source,
        summary: text("summary"),
        content: String::new(),
        author: None,
        published_at: meta
            .get("published_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        fetched_at: Utc::now(),
        tags: Vec::new(),
        metadata: Map::new(),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        s.chars().take(max).collect()
    } else {
        s.to_string()
    }
}
