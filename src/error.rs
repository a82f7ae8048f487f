//! # Error Kinds — Disposition Table
//!
//! Every component exposes a narrow [`thiserror`] enum. [`ApiError`] wraps
//! whichever of those crossed the HTTP boundary and maps it to the
//! disposition table: user-caused problems are 4xx, transient backend
//! problems are 5xx, and semantic "I couldn't help" outcomes are 2xx with
//! a structured body so the caller can render them without treating them
//! as failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors raised while turning a file or URL into plain text (C1).
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to fetch url: {0}")]
    FetchFailed(String),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the embedder gateway (C4).
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("embedder unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the hybrid index / document registry (C5/C6).
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("unknown document: {0}")]
    UnknownDocument(String),
}

/// Errors raised while routing or assembling a chat response (C7).
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error("llm provider failed: {0}")]
    Llm(String),
}

/// Top-level error surfaced at the HTTP boundary.
///
/// Carries enough information to pick the right status code per the
/// disposition table without the handler re-deriving it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Embed(#[from] EmbedError),
    #[error(transparent)]
    Index(#[from] IndexError),
    #[error(transparent)]
    Router(#[from] RouterError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    details: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::Extract(ExtractError::UnsupportedFormat(_)) => {
                (StatusCode::BAD_REQUEST, "unsupported_format")
            }
            ApiError::Extract(ExtractError::FetchFailed(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "fetch_failed")
            }
            ApiError::Extract(ExtractError::Io(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "io_error")
            }
            ApiError::Embed(EmbedError::Unavailable(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedder_unavailable")
            }
            ApiError::Index(IndexError::UnknownDocument(_)) => {
                (StatusCode::BAD_REQUEST, "unknown_document")
            }
            ApiError::Router(RouterError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_request")
            }
            ApiError::Router(RouterError::Embed(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "embedder_unavailable")
            }
            ApiError::Router(RouterError::Llm(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "llm_unavailable")
            }
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
        };
        tracing::warn!(error = %self, status = %status, "request failed");
        let body = ErrorBody {
            error: error.to_string(),
            details: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
