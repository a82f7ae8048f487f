//! End-to-end HTTP tests: real `Router`, fake embedder and LLM backends.
//!
//! Documents are ingested through the actual `/api/documents/upload`
//! multipart endpoint rather than by poking the corpus directly, so these
//! tests exercise extraction and chunking too, not just routing.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use corpus_chat::config::AppConfig;
use corpus_chat::conversation::ConversationStore;
use corpus_chat::embedder::test_support::FakeBackend;
use corpus_chat::embedder::EmbedderGateway;
use corpus_chat::index::Corpus;
use corpus_chat::llm::test_support::FakeProvider;
use corpus_chat::llm::{LlmGateway, ProviderType};
use corpus_chat::web::create_router;
use corpus_chat::web::state::AppState;

const BOUNDARY: &str = "chat-flow-test-boundary";

fn router_with(config: AppConfig, llm: LlmGateway) -> Router {
    let state = AppState {
        config: Arc::new(config),
        corpus: Arc::new(Corpus::new()),
        conversations: Arc::new(ConversationStore::new()),
        embedder: Arc::new(EmbedderGateway::with_backend(Arc::new(FakeBackend {
            dimension: 32,
        }))),
        llm: Arc::new(llm),
    };
    create_router(state)
}

fn no_llm_router(config: AppConfig) -> Router {
    router_with(config, LlmGateway::new(vec![]))
}

fn degraded_llm_router(config: AppConfig, response: &str) -> Router {
    router_with(
        config,
        LlmGateway::new(vec![Arc::new(FakeProvider {
            provider_type: ProviderType::Local,
            available: true,
            response: response.to_string(),
        })]),
    )
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_body(filename: &str, content: &str) -> Vec<u8> {
    format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    )
    .into_bytes()
}

async fn upload(app: &Router, filename: &str, content: &str) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/documents/upload")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(filename, content)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn chat(app: &Router, message: &str, mode: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/chat")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "message": message, "mode": mode })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

async fn search(app: &Router, query: &str) -> Value {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/search")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_vec(&json!({ "query": query, "topK": 8 })).unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn empty_corpus_auto_mode_answers_in_general_mode() {
    let app = no_llm_router(AppConfig::default());
    let (status, body) = chat(&app, "Hello", "auto").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "general");
    assert_eq!(body["sources"], json!([]));
}

#[tokio::test]
async fn hint_term_routes_to_rag_and_cites_the_matching_document() {
    let app = degraded_llm_router(AppConfig::default(), "cats purr when content");
    upload(&app, "cats.txt", "Cats purr when content.").await;

    let (status, body) = chat(&app, "What does the document say about cats?", "auto").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "rag");
    assert_eq!(body["sources"][0]["source"], "cats.txt");
    assert!(body["retrievedCount"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn threshold_fallback_never_fabricates_a_non_matching_answer() {
    let app = no_llm_router(AppConfig::default());
    upload(
        &app,
        "policy.txt",
        "The reimbursement limit is 500 dollars per quarter.",
    )
    .await;

    let (status, body) = chat(&app, "banana", "rag").await;
    assert_eq!(status, StatusCode::OK);
    if body["noRelevantResults"].as_bool().unwrap_or(false) {
        assert_eq!(body["sources"], json!([]));
    } else {
        for source in body["sources"].as_array().unwrap() {
            assert_eq!(source["source"], "policy.txt");
        }
    }
}

#[tokio::test]
async fn rag_without_corpus_is_refused_before_any_llm_call() {
    let app = degraded_llm_router(AppConfig::default(), "should never be seen");
    let (status, body) = chat(&app, "summarize", "rag").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "error");
    assert_ne!(body["answer"].as_str().unwrap(), "should never be seen");
}

#[tokio::test]
async fn deleting_a_document_isolates_it_from_search() {
    let app = no_llm_router(AppConfig::default());
    let uploaded_a = upload(&app, "a.txt", "unique-term-alpha appears here").await;
    upload(&app, "b.txt", "unique-term-beta appears here").await;
    let doc_id_a = uploaded_a["results"][0]["docId"].as_str().unwrap().to_string();

    let delete_response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/documents/{doc_id_a}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(delete_response.status(), StatusCode::OK);

    let hits_a = search(&app, "unique-term-alpha").await;
    assert!(hits_a["results"]
        .as_array()
        .unwrap()
        .iter()
        .all(|h| h["source"] != "a.txt"));

    let hits_b = search(&app, "unique-term-beta").await;
    assert!(hits_b["results"]
        .as_array()
        .unwrap()
        .iter()
        .any(|h| h["source"] == "b.txt"));
}

#[tokio::test]
async fn higher_keyword_frequency_ranks_first() {
    // A chunk_size of 1 forces one sentence per chunk, so this document
    // splits into exactly two chunks: one containing "turtles" twice, one
    // containing it zero times.
    let config = AppConfig {
        chunk_size: 1,
        chunk_overlap: 0,
        ..AppConfig::default()
    };
    let app = no_llm_router(config);
    upload(
        &app,
        "animals.txt",
        "Turtles turtles swim slowly across the pond every summer morning. \
         Ducks waddle near the water edge this afternoon without much hurry.",
    )
    .await;

    let results = search(&app, "turtles").await;
    let first = &results["results"][0];
    assert_eq!(first["id"], "animals.txt-chunk-0");
}
