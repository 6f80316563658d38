//! Test utilities for vigil-core
//!
//! Provides a mock LLM HTTP server speaking the Ollama, Anthropic and Gemini
//! wire formats, plus transaction builders for unit tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use serde_json::{json, Value};
use tokio::sync::oneshot;

use crate::models::Transaction;

/// What the mock server answers to generation requests
#[derive(Debug, Clone)]
pub enum MockReply {
    /// 200 with this text in the backend's response format
    Text(String),
    /// Bare status code with an empty body
    Status(u16),
    /// Text, but only after sleeping
    Delayed(Duration, String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        MockReply::Text(text.into())
    }
}

#[derive(Debug, Default)]
struct Seen {
    last_prompt: Option<String>,
    last_api_key: Option<String>,
    requests: usize,
}

#[derive(Clone)]
struct ServerState {
    reply: MockReply,
    seen: Arc<Mutex<Seen>>,
}

/// Mock LLM server for backend tests
pub struct MockLlmServer {
    addr: SocketAddr,
    seen: Arc<Mutex<Seen>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockLlmServer {
    /// Start the mock server on an available port
    pub async fn start(reply: MockReply) -> Self {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let state = ServerState {
            reply,
            seen: seen.clone(),
        };

        let app = Router::new()
            // Ollama
            .route("/api/tags", get(handle_ok))
            .route("/api/generate", post(handle_ollama_generate))
            // Anthropic
            .route("/v1/models", get(handle_ok))
            .route("/v1/messages", post(handle_anthropic_messages))
            // Gemini: GET model for health, POST "{model}:generateContent"
            .route(
                "/v1beta/models/:model",
                get(handle_ok).post(handle_gemini_generate),
            )
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            seen,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// User prompt text of the most recent generation request
    pub fn last_prompt(&self) -> Option<String> {
        self.seen.lock().unwrap().last_prompt.clone()
    }

    /// API key header of the most recent generation request
    pub fn last_api_key(&self) -> Option<String> {
        self.seen.lock().unwrap().last_api_key.clone()
    }

    /// Number of generation requests received
    pub fn requests(&self) -> usize {
        self.seen.lock().unwrap().requests
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockLlmServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_ok() -> Json<Value> {
    Json(json!({ "models": [{ "name": "test-model:latest" }], "data": [] }))
}

/// Record the request and resolve the configured reply to text or a status
async fn resolve(
    state: &ServerState,
    prompt: Option<&str>,
    api_key: Option<&str>,
) -> Result<String, StatusCode> {
    {
        let mut seen = state.seen.lock().unwrap();
        seen.last_prompt = prompt.map(str::to_string);
        seen.last_api_key = api_key.map(str::to_string);
        seen.requests += 1;
    }

    match &state.reply {
        MockReply::Text(text) => Ok(text.clone()),
        MockReply::Status(code) => {
            Err(StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR))
        }
        MockReply::Delayed(delay, text) => {
            tokio::time::sleep(*delay).await;
            Ok(text.clone())
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn handle_ollama_generate(
    State(state): State<ServerState>,
    Json(body): Json<Value>,
) -> Response {
    let prompt = body["prompt"].as_str();
    match resolve(&state, prompt, None).await {
        Ok(text) => Json(json!({
            "model": body["model"],
            "response": text,
            "done": true,
        }))
        .into_response(),
        Err(status) => status.into_response(),
    }
}

async fn handle_anthropic_messages(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let prompt = body["messages"][0]["content"].as_str();
    match resolve(&state, prompt, header(&headers, "x-api-key")).await {
        Ok(text) => Json(json!({
            "id": "msg_mock",
            "type": "message",
            "role": "assistant",
            "model": body["model"],
            "content": [{ "type": "text", "text": text }],
            "stop_reason": "end_turn",
        }))
        .into_response(),
        Err(status) => status.into_response(),
    }
}

async fn handle_gemini_generate(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let prompt = body["contents"][0]["parts"][0]["text"].as_str();
    match resolve(&state, prompt, header(&headers, "x-goog-api-key")).await {
        Ok(text) => Json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP",
            }],
        }))
        .into_response(),
        Err(status) => status.into_response(),
    }
}

/// Build an unreviewed transaction for user 1
pub fn tx(id: i64, date: &str, amount: f64, category: Option<&str>) -> Transaction {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
    Transaction {
        id,
        user_id: 1,
        date,
        description: format!("POS PURCHASE {}", id),
        amount,
        category: category.map(str::to_string),
        merchant_name: None,
        import_hash: format!("hash-{}", id),
        is_reviewed: false,
        is_legitimate: None,
        review_feedback: None,
        reviewed_at: None,
        is_anomaly: false,
        anomaly_explanation: None,
        anomaly_data: None,
        created_at: Utc::now(),
    }
}

/// One grocery purchase per day between $50 and $100, newest first, ending 2024-06-29
pub fn grocery_history(days: i64) -> Vec<Transaction> {
    let end = NaiveDate::from_ymd_opt(2024, 6, 29).unwrap();
    (0..days)
        .map(|i| {
            let date = end - ChronoDuration::days(i);
            let amount = 50.0 + ((i * 37) % 51) as f64;
            let mut t = tx(i + 1, &date.to_string(), amount, Some("Groceries"));
            t.merchant_name = Some("Whole Foods".to_string());
            t
        })
        .collect()
}
