//! # Hybrid Index (C5) + Document Registry (C6)
//!
//! Combined into one [`Corpus`] guarded by one `parking_lot::RwLock`.
//! Keeping chunks and document metadata under a single lock avoids a
//! two-lock ordering hazard on `add`/`remove`, since both halves must
//! update atomically.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::IndexError;
use crate::keywords::extract_keywords;
use crate::model::{Chunk, Document, ScoredChunk};

const MAX_IMPORTANT_WORDS: usize = 5;

struct CorpusInner {
    chunks: Vec<Chunk>,
    documents: HashMap<String, Document>,
    /// Insertion order of document ids, for stable `list_documents`.
    doc_order: Vec<String>,
}

/// Shared, lock-guarded store of every indexed chunk and its owning document.
pub struct Corpus {
    inner: RwLock<CorpusInner>,
}

impl Default for Corpus {
    fn default() -> Self {
        Self::new()
    }
}

impl Corpus {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(CorpusInner {
                chunks: Vec::new(),
                documents: HashMap::new(),
                doc_order: Vec::new(),
            }),
        }
    }

    /// Insert an already-embedded batch of chunks for one document,
    /// extracting keywords and registering the document atomically.
    ///
    /// Embedding happens before this is called — the write lock is never
    /// held across an embedding call.
    pub fn add(&self, doc_id: &str, name: &str, mut chunks: Vec<Chunk>) {
        for chunk in &mut chunks {
            chunk.doc_id = doc_id.to_string();
            if chunk.keywords.is_empty() {
                chunk.keywords = extract_keywords(&chunk.content);
            }
        }
        let chunk_count = chunks.len();

        let mut guard = self.inner.write();
        guard.chunks.extend(chunks);
        guard.documents.insert(
            doc_id.to_string(),
            Document {
                id: doc_id.to_string(),
                name: name.to_string(),
                chunk_count,
                added_at: Utc::now(),
            },
        );
        guard.doc_order.push(doc_id.to_string());
    }

    /// Evict a document and every chunk it owns.
    pub fn remove(&self, doc_id: &str) -> Result<(), IndexError> {
        let mut guard = self.inner.write();
        if guard.documents.remove(doc_id).is_none() {
            return Err(IndexError::UnknownDocument(doc_id.to_string()));
        }
        guard.chunks.retain(|c| c.doc_id != doc_id);
        guard.doc_order.retain(|id| id != doc_id);
        Ok(())
    }

    pub fn clear(&self) {
        let mut guard = self.inner.write();
        guard.chunks.clear();
        guard.documents.clear();
        guard.doc_order.clear();
    }

    pub fn count_documents(&self) -> usize {
        self.inner.read().documents.len()
    }

    pub fn count_chunks(&self) -> usize {
        self.inner.read().chunks.len()
    }

    pub fn has_documents(&self) -> bool {
        self.count_documents() > 0
    }

    pub fn list_documents(&self) -> Vec<Document> {
        let guard = self.inner.read();
        guard
            .doc_order
            .iter()
            .filter_map(|id| guard.documents.get(id).cloned())
            .collect()
    }

    /// Rank by vector similarity alone.
    pub fn vector_search(&self, query_embedding: &[f32], k: usize) -> Vec<ScoredChunk> {
        let guard = self.inner.read();
        let mut scored: Vec<ScoredChunk> = guard
            .chunks
            .iter()
            .map(|chunk| {
                let vector_score = cosine(query_embedding, &chunk.embedding);
                ScoredChunk {
                    chunk: chunk.clone(),
                    vector_score,
                    keyword_score: 0.0,
                    phrase_boost: 0.0,
                    score: vector_score,
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// The central algorithm: fuse dense similarity, sparse overlap, and a
    /// phrase-presence bonus. Deterministic for a fixed index and query.
    pub fn hybrid_search(
        &self,
        query_embedding: &[f32],
        query_keywords: &[String],
        k: usize,
    ) -> Vec<ScoredChunk> {
        let guard = self.inner.read();
        let important_words: Vec<&String> =
            query_keywords.iter().take(MAX_IMPORTANT_WORDS).collect();

        let mut scored: Vec<(usize, ScoredChunk)> = guard
            .chunks
            .iter()
            .enumerate()
            .map(|(order, chunk)| {
                let vector_score = cosine(query_embedding, &chunk.embedding);
                let keyword_score = keyword_overlap(query_keywords, &chunk.keywords);
                let phrase_boost = phrase_boost(&important_words, &chunk.content);
                let score = 0.60 * vector_score + 0.25 * keyword_score + phrase_boost;
                (
                    order,
                    ScoredChunk {
                        chunk: chunk.clone(),
                        vector_score,
                        keyword_score,
                        phrase_boost,
                        score,
                    },
                )
            })
            .collect();

        scored.sort_by(|(oa, a), (ob, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| oa.cmp(ob))
        });
        scored.truncate(k);
        scored.into_iter().map(|(_, sc)| sc).collect()
    }
}

/// Cosine similarity. Both sides are expected L2-normalized, so this
/// reduces to a dot product — but we don't assume that here, only rely on
/// it as an optimization opportunity we decline for clarity.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    dot
}

fn keyword_overlap(query_kw: &[String], chunk_kw: &[String]) -> f32 {
    if query_kw.is_empty() {
        return 0.0;
    }
    let chunk_set: std::collections::HashSet<&String> = chunk_kw.iter().collect();
    let overlap = query_kw.iter().filter(|k| chunk_set.contains(k)).count();
    overlap as f32 / query_kw.len().max(1) as f32
}

fn phrase_boost(important_words: &[&String], content: &str) -> f32 {
    let lowered = content.to_lowercase();
    let mut boost = 0.0f32;
    for word in important_words {
        if lowered.contains(word.as_str()) {
            boost += 0.05;
        }
    }
    if important_words.len() >= 2 {
        let bigram = format!("{} {}", important_words[0], important_words[1]);
        if lowered.contains(&bigram) {
            boost += 0.10;
        }
    }
    boost.min(0.15)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkMetadata;

    fn chunk(id: &str, doc_id: &str, content: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            doc_id: doc_id.to_string(),
            content: content.to_string(),
            metadata: ChunkMetadata {
                source: doc_id.to_string(),
                content_type: "text".to_string(),
                chunk_index: 0,
                char_start: 0,
                char_end: content.len(),
                title: None,
            },
            embedding,
            keywords: extract_keywords(content),
        }
    }

    #[test]
    fn add_increases_counts_exactly() {
        let corpus = Corpus::new();
        let chunks = vec![
            chunk("a-chunk-0", "a", "first chunk", vec![1.0, 0.0]),
            chunk("a-chunk-1", "a", "second chunk", vec![0.0, 1.0]),
        ];
        corpus.add("a", "a.txt", chunks);
        assert_eq!(corpus.count_chunks(), 2);
        assert_eq!(corpus.count_documents(), 1);
    }

    #[test]
    fn remove_evicts_all_owned_chunks() {
        let corpus = Corpus::new();
        corpus.add(
            "a",
            "a.txt",
            vec![chunk("a-chunk-0", "a", "alpha", vec![1.0, 0.0])],
        );
        corpus.add(
            "b",
            "b.txt",
            vec![chunk("b-chunk-0", "b", "beta", vec![0.0, 1.0])],
        );
        corpus.remove("a").unwrap();
        assert_eq!(corpus.count_documents(), 1);
        assert_eq!(corpus.count_chunks(), 1);
        assert!(corpus
            .hybrid_search(&[0.0, 1.0], &["beta".to_string()], 10)
            .iter()
            .all(|sc| sc.chunk.doc_id != "a"));
    }

    #[test]
    fn remove_unknown_document_errors() {
        let corpus = Corpus::new();
        assert!(corpus.remove("missing").is_err());
    }

    #[test]
    fn clear_is_idempotent() {
        let corpus = Corpus::new();
        corpus.add(
            "a",
            "a.txt",
            vec![chunk("a-chunk-0", "a", "alpha", vec![1.0, 0.0])],
        );
        corpus.clear();
        corpus.clear();
        assert_eq!(corpus.count_documents(), 0);
        assert_eq!(corpus.count_chunks(), 0);
    }

    #[test]
    fn hybrid_search_is_deterministic() {
        let corpus = Corpus::new();
        corpus.add(
            "a",
            "a.txt",
            vec![
                chunk("a-chunk-0", "a", "cats purr softly", vec![0.6, 0.8]),
                chunk("a-chunk-1", "a", "dogs bark loudly", vec![0.8, 0.6]),
            ],
        );
        let q = vec!["cats".to_string()];
        let first = corpus.hybrid_search(&[0.6, 0.8], &q, 8);
        let second = corpus.hybrid_search(&[0.6, 0.8], &q, 8);
        assert_eq!(
            first.iter().map(|s| s.chunk.id.clone()).collect::<Vec<_>>(),
            second.iter().map(|s| s.chunk.id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn hybrid_search_respects_k_and_index_size() {
        let corpus = Corpus::new();
        corpus.add(
            "a",
            "a.txt",
            vec![chunk("a-chunk-0", "a", "only one chunk here", vec![1.0, 0.0])],
        );
        let results = corpus.hybrid_search(&[1.0, 0.0], &[], 8);
        assert!(results.len() <= 1);
    }

    #[test]
    fn scores_lie_within_algebraic_bounds() {
        let corpus = Corpus::new();
        corpus.add(
            "a",
            "a.txt",
            vec![chunk("a-chunk-0", "a", "some arbitrary content", vec![-1.0, 0.0])],
        );
        let results = corpus.hybrid_search(&[1.0, 0.0], &["arbitrary".to_string()], 8);
        for r in &results {
            assert!(r.score >= -0.45 && r.score <= 0.85);
            assert!(r.keyword_score >= 0.0 && r.keyword_score <= 1.0);
            assert!(r.phrase_boost >= 0.0 && r.phrase_boost <= 0.15);
        }
    }

    #[test]
    fn scoring_monotonicity_prefers_repeated_keyword() {
        let corpus = Corpus::new();
        let chunk_x = chunk(
            "doc-chunk-0",
            "doc",
            "quarterly quarterly report details",
            vec![1.0, 0.0],
        );
        let chunk_y = chunk("doc-chunk-1", "doc", "unrelated filler text", vec![1.0, 0.0]);
        corpus.add("doc", "doc.txt", vec![chunk_x.clone(), chunk_y.clone()]);
        let results = corpus.hybrid_search(&[1.0, 0.0], &["quarterly".to_string()], 2);
        assert_eq!(results[0].chunk.id, chunk_x.id);
    }

    #[test]
    fn add_then_remove_restores_chunk_count() {
        let corpus = Corpus::new();
        let before = corpus.count_chunks();
        corpus.add(
            "a",
            "a.txt",
            vec![chunk("a-chunk-0", "a", "alpha", vec![1.0, 0.0])],
        );
        corpus.remove("a").unwrap();
        assert_eq!(corpus.count_chunks(), before);
    }
}
