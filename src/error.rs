// src/error.rs
//! Engine error taxonomy and its HTTP mapping.
//!
//! Collaborator failures stay distinguishable from "no results": handlers
//! surface them as typed error bodies instead of silently returning empty
//! payloads.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Embedding provider unreachable, or it returned no usable vector.
    #[error("embedding failure: {0}")]
    Embedding(String),
    /// Vector index upsert/query/stats call failed.
    #[error("vector index failure: {0}")]
    Index(String),
    /// Insight model call failed.
    #[error("ai generation failure: {0}")]
    Generation(String),
    /// Malformed caller input; always surfaced, never coerced.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl EngineError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Embedding(_) => "embedding_failed",
            EngineError::Index(_) => "vector_db_error",
            EngineError::Generation(_) => "ai_generation_error",
            EngineError::Validation(_) => "validation_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            // Upstream dependency failures are gateway errors, not ours.
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorDetail,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            EngineError::Validation(_) => {
                tracing::warn!(code = self.code(), error = %self, "request rejected")
            }
            _ => tracing::error!(code = self.code(), error = %self, "request failed"),
        }
        let body = ErrorBody {
            success: false,
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
