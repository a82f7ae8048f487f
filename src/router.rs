//! # Chat Router (C7)
//!
//! Resolves a query's mode, retrieves context when grounded, assembles the
//! prompt, and formats citations. This is the component that ties C5
//! (hybrid index), C8 (conversation memory), and C9 (LLM gateway)
//! together — the only one of the three that any of the others depends on.

use crate::config::AppConfig;
use crate::embedder::EmbedderGateway;
use crate::error::RouterError;
use crate::index::Corpus;
use crate::keywords::extract_keywords;
use crate::llm::{self, CompletionParams, LlmGateway};
use crate::model::{ChatMode, Message, SourceCitation};

const DOC_KEYWORD_HINTS: &[&str] = &[
    "document",
    "file",
    "uploaded",
    "says",
    "mentioned",
    "according to",
    "in the",
    "from the",
    "based on",
    "what does",
    "find",
    "search",
    "look for",
    "locate",
    "extract",
    "summarize",
    "summary",
];

const RAG_WITHOUT_CORPUS_MESSAGE: &str =
    "I don't have any documents loaded yet, so I can't answer in grounded mode. Upload a document first, or ask in general mode.";
const NO_RELEVANT_RESULTS_MESSAGE: &str =
    "I couldn't find anything relevant to that question in the indexed documents.";
const NO_LLM_OPEN_MESSAGE_PREFIX: &str =
    "No language model is currently configured, so I can't generate an answer. You asked:";

/// The final shape of a routed chat turn.
pub struct RouteResult {
    pub answer: String,
    pub mode: ChatMode,
    pub sources: Vec<SourceCitation>,
    pub retrieved_count: Option<usize>,
    pub no_relevant_results: bool,
}

pub struct ChatRouter<'a> {
    pub corpus: &'a Corpus,
    pub embedder: &'a EmbedderGateway,
    pub llm: &'a LlmGateway,
    pub config: &'a AppConfig,
}

impl<'a> ChatRouter<'a> {
    /// Route one turn. `history` must already be the full conversation so
    /// far (the router itself truncates to `history_window`).
    pub async fn route(
        &self,
        query: &str,
        requested_mode: ChatMode,
        history: &[Message],
    ) -> Result<RouteResult, RouterError> {
        if query.trim().is_empty() {
            return Err(RouterError::InvalidRequest("message must not be empty".to_string()));
        }

        let mode = self.resolve_mode(query, requested_mode).await?;

        match mode {
            ChatMode::Error => Ok(RouteResult {
                answer: RAG_WITHOUT_CORPUS_MESSAGE.to_string(),
                mode: ChatMode::Error,
                sources: Vec::new(),
                retrieved_count: None,
                no_relevant_results: false,
            }),
            ChatMode::Rag => self.route_grounded(query, history).await,
            ChatMode::General | ChatMode::Auto => self.route_open(query, history).await,
        }
    }

    /// Resolves the effective mode for a turn. Returns `ChatMode::Error`
    /// to signal a grounded request against an empty corpus, refused
    /// before any LLM call is made.
    async fn resolve_mode(
        &self,
        query: &str,
        requested_mode: ChatMode,
    ) -> Result<ChatMode, RouterError> {
        match requested_mode {
            ChatMode::Rag if !self.corpus.has_documents() => Ok(ChatMode::Error),
            ChatMode::Rag => Ok(ChatMode::Rag),
            ChatMode::General | ChatMode::Error => Ok(ChatMode::General),
            ChatMode::Auto => {
                if !self.corpus.has_documents() {
                    return Ok(ChatMode::General);
                }
                let lowered = query.to_lowercase();
                if DOC_KEYWORD_HINTS.iter().any(|hint| lowered.contains(hint)) {
                    return Ok(ChatMode::Rag);
                }
                let query_embedding = self.embedder.embed_one(query).await?;
                let query_keywords = extract_keywords(query);
                let top = self.corpus.hybrid_search(&query_embedding, &query_keywords, 1);
                let top_score = top.first().map(|s| s.score).unwrap_or(f32::NEG_INFINITY);
                if top_score > self.config.relevance_threshold {
                    Ok(ChatMode::Rag)
                } else {
                    Ok(ChatMode::General)
                }
            }
        }
    }

    async fn route_grounded(
        &self,
        query: &str,
        history: &[Message],
    ) -> Result<RouteResult, RouterError> {
        let query_embedding = self.embedder.embed_one(query).await?;
        let query_keywords = extract_keywords(query);
        let hits = self.corpus.hybrid_search(
            &query_embedding,
            &query_keywords,
            self.config.retrieval_k,
        );

        let relevant: Vec<_> = hits
            .iter()
            .filter(|h| h.score >= self.config.relevance_threshold)
            .cloned()
            .collect();

        let used = if !relevant.is_empty() {
            relevant
        } else {
            let fallback: Vec<_> = hits
                .iter()
                .filter(|h| h.score >= self.config.fallback_threshold)
                .take(self.config.fallback_k)
                .cloned()
                .collect();
            if fallback.is_empty() {
                return Ok(RouteResult {
                    answer: NO_RELEVANT_RESULTS_MESSAGE.to_string(),
                    mode: ChatMode::Rag,
                    sources: Vec::new(),
                    retrieved_count: Some(0),
                    no_relevant_results: true,
                });
            }
            fallback
        };

        let context = used
            .iter()
            .enumerate()
            .map(|(i, h)| format!("[Source {} - {}]\n{}", i + 1, h.chunk.metadata.source, h.chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        let sources: Vec<SourceCitation> = used
            .iter()
            .enumerate()
            .map(|(i, h)| SourceCitation {
                id: i + 1,
                content: h.chunk.content.clone(),
                source: h.chunk.metadata.source.clone(),
                score: format!("{:.1}%", (h.score * 100.0).clamp(0.0, 100.0)),
                chunk_index: h.chunk.metadata.chunk_index,
            })
            .collect();

        let trimmed_history = last_n(history, self.config.history_window);
        let completion = self
            .llm
            .complete(
                llm::grounded_system_prompt(),
                trimmed_history,
                query,
                CompletionParams {
                    temperature: 0.3,
                    max_tokens: 1024,
                },
            )
            .await
            .map_err(|e| RouterError::Llm(e.to_string()))?;

        let answer = match completion {
            Some(text) => text,
            None => format!(
                "No language model is currently configured. Here is the raw matching context:\n\n{context}"
            ),
        };

        Ok(RouteResult {
            answer,
            mode: ChatMode::Rag,
            sources,
            retrieved_count: Some(used.len()),
            no_relevant_results: false,
        })
    }

    async fn route_open(
        &self,
        query: &str,
        history: &[Message],
    ) -> Result<RouteResult, RouterError> {
        let trimmed_history = last_n(history, self.config.history_window);
        let completion = self
            .llm
            .complete(
                llm::open_system_prompt(),
                trimmed_history,
                query,
                CompletionParams {
                    temperature: 0.7,
                    max_tokens: 1024,
                },
            )
            .await
            .map_err(|e| RouterError::Llm(e.to_string()))?;

        let answer = match completion {
            Some(text) => text,
            None => format!("{NO_LLM_OPEN_MESSAGE_PREFIX} {query}"),
        };

        Ok(RouteResult {
            answer,
            mode: ChatMode::General,
            sources: Vec::new(),
            retrieved_count: None,
            no_relevant_results: false,
        })
    }
}

fn last_n(history: &[Message], n: usize) -> &[Message] {
    let start = history.len().saturating_sub(n);
    &history[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{self, ChunkParams, SourceInfo};
    use crate::embedder::test_support::FakeBackend;
    use crate::llm::test_support::FakeProvider;
    use crate::llm::ProviderType;
    use std::sync::Arc;

    fn router_parts() -> (AppConfig, Corpus, EmbedderGateway) {
        let config = AppConfig::default();
        let corpus = Corpus::new();
        let embedder = EmbedderGateway::with_backend(Arc::new(FakeBackend { dimension: 16 }));
        (config, corpus, embedder)
    }

    fn no_llm_gateway() -> LlmGateway {
        LlmGateway::new(vec![])
    }

    fn degraded_llm_gateway_with_response(text: &str) -> LlmGateway {
        LlmGateway::new(vec![Arc::new(FakeProvider {
            provider_type: ProviderType::Local,
            available: true,
            response: text.to_string(),
        })])
    }

    async fn embed_and_add(corpus: &Corpus, embedder: &EmbedderGateway, doc_id: &str, name: &str, text: &str) {
        let source = SourceInfo {
            source: name.to_string(),
            content_type: "text".to_string(),
            title: None,
        };
        let mut chunks = chunk::chunk(text, &source, ChunkParams::default());
        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = embedder.embed_many(&contents).await.unwrap();
        for (c, e) in chunks.iter_mut().zip(embeddings) {
            c.embedding = e;
        }
        corpus.add(doc_id, name, chunks);
    }

    #[tokio::test]
    async fn empty_corpus_auto_mode_resolves_general() {
        let (config, corpus, embedder) = router_parts();
        let llm = no_llm_gateway();
        let router = ChatRouter {
            corpus: &corpus,
            embedder: &embedder,
            llm: &llm,
            config: &config,
        };
        let result = router.route("Hello", ChatMode::Auto, &[]).await.unwrap();
        assert_eq!(result.mode, ChatMode::General);
        assert!(result.sources.is_empty());
    }

    #[tokio::test]
    async fn hint_term_routes_to_rag() {
        let (config, corpus, embedder) = router_parts();
        embed_and_add(&corpus, &embedder, "cats", "cats.txt", "Cats purr when content.").await;
        let llm = degraded_llm_gateway_with_response("answer");
        let router = ChatRouter {
            corpus: &corpus,
            embedder: &embedder,
            llm: &llm,
            config: &config,
        };
        let result = router
            .route(
                "What does the document say about cats?",
                ChatMode::Auto,
                &[],
            )
            .await
            .unwrap();
        assert_eq!(result.mode, ChatMode::Rag);
        assert_eq!(result.sources[0].source, "cats.txt");
        assert!(result.retrieved_count.unwrap() >= 1);
    }

    #[tokio::test]
    async fn threshold_fallback_never_fabricates() {
        let (config, corpus, embedder) = router_parts();
        embed_and_add(
            &corpus,
            &embedder,
            "policy",
            "policy.txt",
            "The reimbursement limit is 500 dollars per quarter.",
        )
        .await;
        let llm = no_llm_gateway();
        let router = ChatRouter {
            corpus: &corpus,
            embedder: &embedder,
            llm: &llm,
            config: &config,
        };
        let result = router.route("banana", ChatMode::Rag, &[]).await.unwrap();
        if result.no_relevant_results {
            assert!(result.sources.is_empty());
        } else {
            for s in &result.sources {
                assert_eq!(s.source, "policy.txt");
            }
        }
    }

    #[tokio::test]
    async fn rag_without_corpus_returns_error_mode_without_llm_call() {
        let (config, corpus, embedder) = router_parts();
        let llm = degraded_llm_gateway_with_response("should never be called");
        let router = ChatRouter {
            corpus: &corpus,
            embedder: &embedder,
            llm: &llm,
            config: &config,
        };
        let result = router.route("summarize", ChatMode::Rag, &[]).await.unwrap();
        assert_eq!(result.mode, ChatMode::Error);
        assert_eq!(result.answer, RAG_WITHOUT_CORPUS_MESSAGE);
    }

    #[tokio::test]
    async fn delete_isolation_between_documents() {
        let (config, corpus, embedder) = router_parts();
        embed_and_add(&corpus, &embedder, "a", "a.txt", "unique-term-alpha appears here").await;
        embed_and_add(&corpus, &embedder, "b", "b.txt", "unique-term-beta appears here").await;
        corpus.remove("a").unwrap();

        let emb_a = embedder.embed_one("unique-term-alpha").await.unwrap();
        let kw_a = extract_keywords("unique-term-alpha");
        let hits_a = corpus.hybrid_search(&emb_a, &kw_a, 8);
        assert!(hits_a.iter().all(|h| h.chunk.doc_id != "a"));

        let emb_b = embedder.embed_one("unique-term-beta").await.unwrap();
        let kw_b = extract_keywords("unique-term-beta");
        let hits_b = corpus.hybrid_search(&emb_b, &kw_b, 8);
        assert!(hits_b.iter().any(|h| h.chunk.doc_id == "b"));

        let _ = config;
    }
}
