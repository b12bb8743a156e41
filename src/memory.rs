// src/memory.rs
//! Semantic memory: store short contexts, retrieve similar past ones, and
//! assemble RAG insights that blend a current input with retrieved memories.

use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::gemini::{Embedder, InsightModel};
use crate::index::{IndexMatch, VectorIndex, DEFAULT_NAMESPACE};

/// Matches above this similarity are quoted into the insight prompt.
const INSIGHT_MIN_SIMILARITY: f64 = 0.7;
const INSIGHT_TOP_K: usize = 3;

/// Result of RAG insight generation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Insight {
    pub insight: String,
    pub context_used: Vec<String>,
    pub model_used: String,
}

/// Context store/search over the injected embedder and index.
pub struct MemoryStore {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Embed and store a context under a fresh id; returns the id.
    pub async fn remember(&self, text: &str) -> Result<String, EngineError> {
        let values = self.embedder.embed(text).await?;
        let id = Uuid::new_v4().to_string();
        let mut metadata = Map::new();
        metadata.insert("text".into(), text.into());
        self.index
            .upsert(DEFAULT_NAMESPACE, &id, &values, metadata)
            .await?;
        tracing::info!(%id, "context stored");
        Ok(id)
    }

    /// Top-K stored contexts most similar to `text`.
    pub async fn search(&self, text: &str, top_k: usize) -> Result<Vec<IndexMatch>, EngineError> {
        let values = self.embedder.embed(text).await?;
        self.index
            .query(DEFAULT_NAMESPACE, &values, top_k, true)
            .await
    }

    /// RAG insight: retrieve similar memories, quote those above the
    /// similarity bar, and ask the model for contextual feedback.
    pub async fn insight(
        &self,
        model: &dyn InsightModel,
        text: &str,
    ) -> Result<Insight, EngineError> {
        let matches = self.search(text, INSIGHT_TOP_K).await?;

        let context_used: Vec<String> = matches
            .iter()
            .filter(|m| m.similarity > INSIGHT_MIN_SIMILARITY)
            .filter_map(|m| {
                let mem = m.metadata.get("text").and_then(Value::as_str)?;
                (!mem.is_empty()).then(|| format!("- {} (similarity: {:.2})", mem, m.similarity))
            })
            .collect();

        let prompt = build_prompt(&context_used, text);
        let insight = model.generate(&prompt).await?;

        tracing::info!(contexts = context_used.len(), "insight generated");
        Ok(Insight {
            insight,
            context_used,
            model_used: model.model_name().to_string(),
        })
    }
}

fn build_prompt(context_used: &[String], input: &str) -> String {
    let memory_text = if context_used.is_empty() {
        "No relevant past memories found.".to_string()
    } else {
        context_used.join("\n")
    };
    format!(
        "You are PAI, an AI partner who deeply understands the user's context.\n\
         \n\
         [User's Past Concerns/Interests (Memory)]\n\
         {memory_text}\n\
         \n\
         [Current Input]\n\
         {input}\n\
         \n\
         [Instructions]\n\
         Please provide insightful feedback on the current input, referencing the 'past memories' above.\n\
         If there are connections to previous concerns, mention those relationships."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_memories_when_present() {
        let contexts = vec!["- planning a product launch (similarity: 0.82)".to_string()];
        let prompt = build_prompt(&contexts, "how do I prioritize?");
        assert!(prompt.contains("planning a product launch"));
        assert!(prompt.contains("[Current Input]\nhow do I prioritize?"));
        assert!(!prompt.contains("No relevant past memories found."));
    }

    #[test]
    fn prompt_notes_absence_of_memories() {
        let prompt = build_prompt(&[], "hello");
        assert!(prompt.contains("No relevant past memories found."));
    }
}
