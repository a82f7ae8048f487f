//! # Web Layer
//!
//! Axum router assembly plus the submodules it depends on: a thin
//! `create_router` plus `state` and `handlers` submodules. This API is
//! JSON-only — no SSE, no server-rendered pages.
//!
//! ## Routes
//!
//! | Method | Path                | Handler                        |
//! |--------|---------------------|---------------------------------|
//! | GET    | `/api/health`       | [`handlers::health`]            |
//! | GET    | `/api/models`       | [`handlers::list_models`]        |
//! | POST   | `/api/models/set`   | [`handlers::set_model`]          |
//! | POST   | `/api/documents/upload` | [`handlers::upload_documents`] |
//! | POST   | `/api/documents/url`    | [`handlers::ingest_url`]       |
//! | GET    | `/api/documents`    | [`handlers::list_documents`]     |
//! | DELETE | `/api/documents/{id}` | [`handlers::delete_document`]  |
//! | POST   | `/api/documents/clear` | [`handlers::clear_documents`] |
//! | POST   | `/api/chat`         | [`handlers::chat`]               |
//! | POST   | `/api/search`       | [`handlers::search`]             |
//! | GET    | `/api/stats`        | [`handlers::stats`]              |

pub mod dto;
pub mod handlers;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

const MAX_UPLOAD_BODY_BYTES: usize = 10 * 50 * 1024 * 1024;

/// Builds the full Axum router with tracing and permissive CORS layers,
/// serving the JSON API under `/api`.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/models", get(handlers::list_models))
        .route("/models/set", post(handlers::set_model))
        .route(
            "/documents/upload",
            post(handlers::upload_documents).layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES)),
        )
        .route("/documents/url", post(handlers::ingest_url))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/{id}", delete(handlers::delete_document))
        .route("/documents/clear", post(handlers::clear_documents))
        .route("/chat", post(handlers::chat))
        .route("/search", post(handlers::search))
        .route("/stats", get(handlers::stats));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
