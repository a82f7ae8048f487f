//! # HTTP Handlers — the `/api` Surface
//!
//! One async fn per route in [`super::create_router`]: JSON in/out,
//! shared state via `axum::extract::State`.

use axum::extract::{Multipart, Path, State};
use axum::Json;
use uuid::Uuid;

use super::dto::*;
use super::state::AppState;
use crate::chunk::{self, ChunkParams, SourceInfo};
use crate::error::{ApiError, ExtractError, RouterError};
use crate::extract;
use crate::model::{Message, Role};
use crate::router::ChatRouter;

const MAX_UPLOAD_FILES: usize = 10;
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "pptx", "xlsx", "xls", "txt", "md", "markdown", "csv"];

fn accepted(filename: &str) -> bool {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    // Filenames ending in .md are accepted regardless of reported MIME —
    // there is no MIME type inspected here at all, only the extension,
    // which already subsumes that rule.
    ACCEPTED_EXTENSIONS.contains(&ext.as_str())
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        documents_loaded: state.corpus.count_documents(),
        total_chunks: state.corpus.count_chunks(),
        available_models: available_model_ids(&state),
    })
}

fn available_model_ids(state: &AppState) -> Vec<String> {
    state
        .llm
        .available_providers()
        .into_iter()
        .map(|p| p.to_string())
        .collect()
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let current = state
        .llm
        .active()
        .map(|p| p.to_string())
        .unwrap_or_else(|| state.config.default_model.clone());
    Json(ModelsResponse {
        models: available_model_ids(&state),
        current_model: current,
    })
}

pub async fn set_model(
    State(state): State<AppState>,
    Json(req): Json<SetModelRequest>,
) -> Result<Json<SetModelResponse>, ApiError> {
    let provider_type = match req.model.as_str() {
        "local" => crate::llm::ProviderType::Local,
        "hosted-a" => crate::llm::ProviderType::HostedA,
        "hosted-b" => crate::llm::ProviderType::HostedB,
        other => {
            return Err(ApiError::InvalidRequest(format!("unknown model id: {other}")));
        }
    };
    state.llm.set_active(Some(provider_type));
    Ok(Json(SetModelResponse {
        success: true,
        current_model: req.model,
    }))
}

pub async fn upload_documents(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut results = Vec::new();
    let mut processed = 0usize;
    let mut failed = 0usize;
    let mut file_count = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?
    {
        if field.name() != Some("files") {
            continue;
        }
        file_count += 1;
        if file_count > MAX_UPLOAD_FILES {
            results.push(UploadResultEntry {
                filename: field.file_name().unwrap_or("unknown").to_string(),
                success: false,
                error: Some("too many files in one upload".to_string()),
                doc_id: None,
                chunks: None,
            });
            failed += 1;
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                results.push(UploadResultEntry {
                    filename,
                    success: false,
                    error: Some(e.to_string()),
                    doc_id: None,
                    chunks: None,
                });
                failed += 1;
                continue;
            }
        };

        if bytes.len() > MAX_UPLOAD_BYTES {
            results.push(UploadResultEntry {
                filename,
                success: false,
                error: Some("file exceeds 50MB limit".to_string()),
                doc_id: None,
                chunks: None,
            });
            failed += 1;
            continue;
        }

        if !accepted(&filename) {
            results.push(UploadResultEntry {
                filename: filename.clone(),
                success: false,
                error: Some(ExtractError::UnsupportedFormat(filename).to_string()),
                doc_id: None,
                chunks: None,
            });
            failed += 1;
            continue;
        }

        match ingest_bytes(&state, &bytes, &filename).await {
            Ok((doc_id, chunk_count)) => {
                results.push(UploadResultEntry {
                    filename,
                    success: true,
                    error: None,
                    doc_id: Some(doc_id),
                    chunks: Some(chunk_count),
                });
                processed += 1;
            }
            Err(e) => {
                results.push(UploadResultEntry {
                    filename,
                    success: false,
                    error: Some(e.to_string()),
                    doc_id: None,
                    chunks: None,
                });
                failed += 1;
            }
        }
    }

    Ok(Json(UploadResponse {
        processed,
        failed,
        results,
        total_documents: state.corpus.count_documents(),
        total_chunks: state.corpus.count_chunks(),
    }))
}

pub async fn ingest_url(
    State(state): State<AppState>,
    Json(req): Json<UrlIngestRequest>,
) -> Result<Json<UrlIngestResponse>, ApiError> {
    let extracted = extract::extract_url(&req.url).await?;
    let (doc_id, chunk_count) =
        ingest_extracted(&state, extracted, req.url.clone()).await?;
    Ok(Json(UrlIngestResponse {
        doc_id,
        chunks: chunk_count,
        total_documents: state.corpus.count_documents(),
        total_chunks: state.corpus.count_chunks(),
    }))
}

pub async fn list_documents(State(state): State<AppState>) -> Json<DocumentsResponse> {
    Json(DocumentsResponse {
        documents: state.corpus.list_documents(),
        total_chunks: state.corpus.count_chunks(),
    })
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state.corpus.remove(&id)?;
    Ok(Json(SuccessResponse { success: true }))
}

pub async fn clear_documents(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.corpus.clear();
    Json(SuccessResponse { success: true })
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let requested_mode = parse_mode(req.mode.as_deref())
        .ok_or_else(|| ApiError::InvalidRequest(format!("unknown mode: {:?}", req.mode)))?;
    let conversation_id = req
        .conversation_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let user_message = Message {
        role: Role::User,
        content: req.message.clone(),
        timestamp: chrono::Utc::now(),
        mode: None,
        sources: None,
    };
    let history_before = state.conversations.last_n(&conversation_id, usize::MAX);
    state.conversations.append(&conversation_id, user_message);

    let router = ChatRouter {
        corpus: &state.corpus,
        embedder: &state.embedder,
        llm: &state.llm,
        config: &state.config,
    };
    let result = router
        .route(&req.message, requested_mode, &history_before)
        .await
        .map_err(route_error_to_api)?;

    let assistant_message = Message {
        role: Role::Assistant,
        content: result.answer.clone(),
        timestamp: chrono::Utc::now(),
        mode: Some(result.mode),
        sources: if result.sources.is_empty() {
            None
        } else {
            Some(result.sources.clone())
        },
    };
    state.conversations.append(&conversation_id, assistant_message);

    Ok(Json(ChatResponse {
        conversation_id,
        answer: result.answer,
        mode: result.mode,
        sources: result.sources,
        retrieved_count: result.retrieved_count,
        no_relevant_results: if result.no_relevant_results {
            Some(true)
        } else {
            None
        },
    }))
}

fn route_error_to_api(e: RouterError) -> ApiError {
    ApiError::Router(e)
}

pub async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    if req.query.trim().is_empty() {
        return Err(ApiError::InvalidRequest("query must not be empty".to_string()));
    }
    let top_k = req.top_k.unwrap_or(8);
    let query_embedding = state.embedder.embed_one(&req.query).await?;
    let query_keywords = crate::keywords::extract_keywords(&req.query);
    let hits = state
        .corpus
        .hybrid_search(&query_embedding, &query_keywords, top_k);

    let results = hits
        .into_iter()
        .map(|h| SearchResultEntry {
            id: h.chunk.id.clone(),
            content: h.chunk.content.clone(),
            source: h.chunk.metadata.source.clone(),
            score: h.score,
            chunk_index: h.chunk.metadata.chunk_index,
        })
        .collect();

    Ok(Json(SearchResponse { results }))
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        documents: state.corpus.count_documents(),
        chunks: state.corpus.count_chunks(),
        conversations: state.conversations.conversation_count(),
        current_model: state
            .llm
            .active()
            .map(|p| p.to_string())
            .unwrap_or_else(|| state.config.default_model.clone()),
    })
}

/// Shared ingest path for both uploaded files and fetched URLs: extract →
/// chunk → embed → publish. Embedding happens before the corpus write lock
/// is ever taken.
async fn ingest_bytes(
    state: &AppState,
    bytes: &[u8],
    filename: &str,
) -> Result<(String, usize), ApiError> {
    let extracted = extract::extract(bytes, filename)?;
    ingest_extracted(state, extracted, filename.to_string()).await
}

async fn ingest_extracted(
    state: &AppState,
    extracted: extract::Extracted,
    source_name: String,
) -> Result<(String, usize), ApiError> {
    let doc_id = Uuid::new_v4().to_string();
    let source = SourceInfo {
        source: source_name.clone(),
        content_type: extracted.content_type,
        title: extracted.title,
    };
    let mut chunks = chunk::chunk(&extracted.text, &source, ChunkParams {
        chunk_size: state.config.chunk_size,
        chunk_overlap: state.config.chunk_overlap,
    });

    let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = state.embedder.embed_many(&contents).await?;
    for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
        chunk.embedding = embedding;
    }

    let chunk_count = chunks.len();
    state.corpus.add(&doc_id, &source_name, chunks);
    Ok((doc_id, chunk_count))
}

pub fn accepts_upload(filename: &str) -> bool {
    accepted(filename)
}
