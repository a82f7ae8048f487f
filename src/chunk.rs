//! # Chunker (C2)
//!
//! Splits extracted text into overlapping, sentence-boundary-respecting
//! chunks. Produces bare chunk shells — embedding and keywords are filled
//! in later, by C4 and C3 respectively, once the chunk is handed to
//! [`crate::index`].

use std::sync::OnceLock;

use regex::Regex;

use crate::model::{Chunk, ChunkMetadata};

/// Parameters controlling chunk size and overlap.
#[derive(Debug, Clone, Copy)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 200,
        }
    }
}

fn sentence_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:[.!?]+\s+)|(?:\n{2,})").unwrap())
}

fn runs_of_3_newlines_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").unwrap())
}

/// A document's name and content type, carried through to every chunk it
/// produces. This is the input-side counterpart of [`ChunkMetadata`].
pub struct SourceInfo {
    pub source: String,
    pub content_type: String,
    pub title: Option<String>,
}

/// Normalize line endings and collapse excessive blank runs (step 1 of the algorithm).
fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    runs_of_3_newlines_re()
        .replace_all(&unified, "\n\n")
        .into_owned()
}

/// Split normalized text into trimmed, non-empty sentences (step 2).
fn split_sentences(text: &str) -> Vec<String> {
    sentence_split_re()
        .split(text)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Take the trailing `n` whitespace-separated words of `s`.
fn trailing_words(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let words: Vec<&str> = s.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}

/// Split `text` into ordered chunk shells (no embedding, no keywords yet).
///
/// Empty input yields zero chunks. A single sentence longer than
/// `chunk_size` becomes its own oversize chunk rather than being split
/// mid-sentence.
pub fn chunk(text: &str, source: &SourceInfo, params: ChunkParams) -> Vec<Chunk> {
    let normalized = normalize(text);
    let sentences = split_sentences(&normalized);
    if sentences.is_empty() {
        return Vec::new();
    }

    let mut buffers: Vec<String> = Vec::new();
    let mut current = String::new();

    let overlap_words = |buf: &str| -> String {
        let ratio = params.chunk_overlap as f64 / params.chunk_size as f64;
        let n = (ratio * word_count(buf) as f64).ceil() as usize;
        trailing_words(buf, n)
    };

    for sentence in &sentences {
        let would_be = if current.is_empty() {
            sentence.len()
        } else {
            current.len() + 1 + sentence.len()
        };

        if !current.is_empty() && would_be > params.chunk_size {
            buffers.push(std::mem::take(&mut current));
            let seed = overlap_words(buffers.last().unwrap());
            current = seed;
        }

        if current.is_empty() {
            current = sentence.clone();
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
    }
    if !current.is_empty() {
        buffers.push(current);
    }

    let stride = params.chunk_size.saturating_sub(params.chunk_overlap).max(1);
    buffers
        .into_iter()
        .enumerate()
        .map(|(idx, content)| {
            let char_start = idx * stride;
            let char_end = char_start + content.len();
            Chunk {
                id: format!("{}-chunk-{}", source.source, idx),
                doc_id: String::new(),
                content,
                metadata: ChunkMetadata {
                    source: source.source.clone(),
                    content_type: source.content_type.clone(),
                    chunk_index: idx,
                    char_start,
                    char_end,
                    title: source.title.clone(),
                },
                embedding: Vec::new(),
                keywords: Vec::new(),
            }
        })
        .collect()
}
