//! # Shared Data Model
//!
//! Types that cross component boundaries: the chunk and document records
//! held by the hybrid index, the transient scored-chunk result shape, and
//! the conversation/message records kept by the in-session memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata stamped on a chunk at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Filename or URL the chunk was extracted from.
    pub source: String,
    /// Coarse content type, e.g. `"pdf"`, `"webpage"`, `"text"`.
    pub content_type: String,
    /// Position of this chunk within its document, 0-based.
    pub chunk_index: usize,
    /// Advisory character offset computed from the chunker's running
    /// position; not re-verified against the source string after overlap
    /// insertion.
    pub char_start: usize,
    /// Advisory character offset, same caveat as `char_start`.
    pub char_end: usize,
    /// Page/slide/document title, when the extractor found one.
    pub title: Option<String>,
}

/// The unit of retrieval. Immutable once inserted into the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within the index: `<source-name>-chunk-<index>`.
    pub id: String,
    /// Owning document.
    pub doc_id: String,
    /// Trimmed text, at most `chunk_size` characters.
    pub content: String,
    pub metadata: ChunkMetadata,
    /// L2-normalized dense vector, length D (the embedder's output width).
    pub embedding: Vec<f32>,
    /// Up to 20 distinct lowercase tokens, highest-frequency first.
    pub keywords: Vec<String>,
}

/// Document registry entry, kept in lock-step with the chunks the index holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Filename or URL as presented by the client.
    pub name: String,
    pub chunk_count: usize,
    pub added_at: DateTime<Utc>,
}

/// A chunk returned from a search, carrying its computed scores.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Cosine similarity in [-1, 1].
    pub vector_score: f32,
    /// Keyword overlap ratio in [0, 1].
    pub keyword_score: f32,
    /// Phrase-presence bonus in [0, 0.15].
    pub phrase_boost: f32,
    /// `0.60 * vector_score + 0.25 * keyword_score + phrase_boost`.
    pub score: f32,
}

/// The three chat modes a client may request or the router may resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Auto,
    Rag,
    General,
    /// Used only on the grounded-request-against-empty-corpus refusal path.
    Error,
}

impl std::fmt::Display for ChatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChatMode::Auto => "auto",
            ChatMode::Rag => "rag",
            ChatMode::General => "general",
            ChatMode::Error => "error",
        };
        write!(f, "{s}")
    }
}

/// Speaker role for a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub mode: Option<ChatMode>,
    pub sources: Option<Vec<SourceCitation>>,
}

/// A single citation attached to a grounded answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceCitation {
    pub id: usize,
    pub content: String,
    pub source: String,
    /// Combined score rendered as a percentage string, clamped to [0, 100].
    pub score: String,
    pub chunk_index: usize,
}
