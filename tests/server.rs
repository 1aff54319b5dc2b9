mod common;

use std::net::SocketAddr;

use common::{engine, write_corpus, FAKE_ANSWER};
use mdrag::server::{self, AppState, ErrorBody, HealthResponse};
use mdrag::{Answer, IngestOptions, StoreState};
use pretty_assertions::assert_eq;
use reqwest::StatusCode;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn spawn_server(state: AppState) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(listener, state));
    addr
}

async fn health(client: &reqwest::Client, addr: SocketAddr) -> HealthResponse {
    client
        .get(format!("http://{addr}/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn serves_health_and_grounded_answers() {
    let data = TempDir::new().unwrap();
    let storage_dir = TempDir::new().unwrap();
    write_corpus(data.path());
    let fx = engine(storage_dir.path());
    let addr = spawn_server(AppState::new(fx.engine.clone(), 5, 20)).await;
    let client = reqwest::Client::new();
    let chat_url = format!("http://{addr}/chat");

    let before = health(&client, addr).await;
    assert_eq!(before.status, "unavailable");
    assert!(!before.index_loaded);
    assert_eq!(before.state, StoreState::Uninitialized);

    let resp = client
        .post(&chat_url)
        .json(&json!({ "question": "hello?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: ErrorBody = resp.json().await.unwrap();
    assert!(body.message.contains("index not loaded"));

    let snapshot = fx.engine.ingest(data.path(), &IngestOptions::default()).unwrap();

    let after = health(&client, addr).await;
    assert_eq!(after.status, "ok");
    assert!(after.index_loaded);
    assert_eq!(after.chunks, snapshot.len());
    assert_eq!(after.dimension, Some(common::FAKE_DIM));

    let resp = client
        .post(&chat_url)
        .json(&json!({ "question": "Short doc", "top_k": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let answer: Answer = resp.json().await.unwrap();
    assert_eq!(answer.answer, FAKE_ANSWER);
    assert_eq!(answer.citations.len(), 2);
    assert_eq!(answer.citations[0].chunk_id, "b_0");
}

#[tokio::test]
async fn rejects_bad_requests_with_400() {
    let storage_dir = TempDir::new().unwrap();
    let fx = engine(storage_dir.path());
    let addr = spawn_server(AppState::new(fx.engine.clone(), 5, 20)).await;
    let client = reqwest::Client::new();
    let chat_url = format!("http://{addr}/chat");

    let resp = client
        .post(&chat_url)
        .json(&json!({ "question": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = resp.json().await.unwrap();
    assert_eq!(body.message, "question is required");

    let resp = client
        .post(&chat_url)
        .json(&json!({ "question": "hi", "top_k": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(fx.embedder.calls(), 0);
}
