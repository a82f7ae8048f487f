//! JSON request/response bodies for the `/api` surface: plain `serde`-
//! derived structs returned straight from handlers, camelCase on the wire.

use serde::{Deserialize, Serialize};

use crate::model::{ChatMode, Document, SourceCitation};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(rename = "documentsLoaded")]
    pub documents_loaded: usize,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
    #[serde(rename = "availableModels")]
    pub available_models: Vec<String>,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<String>,
    #[serde(rename = "currentModel")]
    pub current_model: String,
}

#[derive(Deserialize)]
pub struct SetModelRequest {
    pub model: String,
}

#[derive(Serialize)]
pub struct SetModelResponse {
    pub success: bool,
    #[serde(rename = "currentModel")]
    pub current_model: String,
}

#[derive(Serialize)]
pub struct UploadResultEntry {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "docId")]
    pub doc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
}

#[derive(Serialize)]
pub struct UploadResponse {
    pub processed: usize,
    pub failed: usize,
    pub results: Vec<UploadResultEntry>,
    #[serde(rename = "totalDocuments")]
    pub total_documents: usize,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
}

#[derive(Deserialize)]
pub struct UrlIngestRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct UrlIngestResponse {
    #[serde(rename = "docId")]
    pub doc_id: String,
    pub chunks: usize,
    #[serde(rename = "totalDocuments")]
    pub total_documents: usize,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
}

#[derive(Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<Document>,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "conversationId")]
    pub conversation_id: Option<String>,
    pub mode: Option<String>,
    #[serde(default)]
    pub streaming: bool,
}

#[derive(Serialize)]
pub struct ChatResponse {
    #[serde(rename = "conversationId")]
    pub conversation_id: String,
    pub answer: String,
    pub mode: ChatMode,
    pub sources: Vec<SourceCitation>,
    #[serde(rename = "retrievedCount", skip_serializing_if = "Option::is_none")]
    pub retrieved_count: Option<usize>,
    #[serde(rename = "noRelevantResults", skip_serializing_if = "Option::is_none")]
    pub no_relevant_results: Option<bool>,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(rename = "topK")]
    pub top_k: Option<usize>,
}

#[derive(Serialize)]
pub struct SearchResultEntry {
    pub id: String,
    pub content: String,
    pub source: String,
    pub score: f32,
    #[serde(rename = "chunkIndex")]
    pub chunk_index: usize,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultEntry>,
}

#[derive(Serialize)]
pub struct StatsResponse {
    pub documents: usize,
    pub chunks: usize,
    pub conversations: usize,
    #[serde(rename = "currentModel")]
    pub current_model: String,
}

/// Parse the wire-level mode string into a [`ChatMode`], defaulting to
/// `auto` when absent. Unknown strings are rejected by the handler.
pub fn parse_mode(raw: Option<&str>) -> Option<ChatMode> {
    match raw.unwrap_or("auto") {
        "auto" => Some(ChatMode::Auto),
        "rag" => Some(ChatMode::Rag),
        "general" => Some(ChatMode::General),
        _ => None,
    }
}
