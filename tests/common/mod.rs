#![allow(dead_code)]

use async_trait::async_trait;
use axum::{extract::State, http::{HeaderMap, StatusCode, Uri}, routing::post, Json, Router};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mnfp_advisor::{AdvisorError, ConversationTurn, GenerativeModelGateway, Result, SchemaDescriptor};

/// Canned behaviour for one stubbed gateway method.
#[derive(Clone)]
pub enum Reply {
    Text(String),
    Empty,
    Upstream(String),
}

impl Reply {
    fn into_result(self) -> Result<String> {
        match self {
            Reply::Text(text) => Ok(text),
            Reply::Empty => Err(AdvisorError::EmptyResponse),
            Reply::Upstream(msg) => Err(AdvisorError::Upstream(msg)),
        }
    }
}

/// In-process gateway returning scripted replies and counting calls.
pub struct StubGateway {
    text: Reply,
    structured: Reply,
    pub text_calls: AtomicUsize,
    pub structured_calls: AtomicUsize,
    pub last_schema: Mutex<Option<SchemaDescriptor>>,
}

impl StubGateway {
    pub fn new(text: Reply, structured: Reply) -> Arc<Self> {
        Arc::new(Self {
            text,
            structured,
            text_calls: AtomicUsize::new(0),
            structured_calls: AtomicUsize::new(0),
            last_schema: Mutex::new(None),
        })
    }

    pub fn text(reply: Reply) -> Arc<Self> {
        Self::new(reply, Reply::Upstream("not scripted".into()))
    }

    pub fn structured(reply: Reply) -> Arc<Self> {
        Self::new(Reply::Upstream("not scripted".into()), reply)
    }

    pub fn calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst) + self.structured_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModelGateway for StubGateway {
    async fn generate_text(&self, _prompt: &str, _system_instruction: &str) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone().into_result()
    }

    async fn generate_structured(
        &self,
        _image: &[u8],
        _mime_type: &str,
        _instruction: &str,
        schema: &SchemaDescriptor,
    ) -> Result<String> {
        self.structured_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_schema.lock().unwrap() = Some(schema.clone());
        self.structured.clone().into_result()
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}

/// Gateway whose replies are derived from the request, for cross-talk checks.
pub struct EchoGateway;

#[async_trait]
impl GenerativeModelGateway for EchoGateway {
    async fn generate_text(&self, prompt: &str, _system_instruction: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_millis((prompt.len() % 7) as u64)).await;
        Ok(format!("advice for {}", prompt))
    }

    async fn generate_structured(
        &self,
        image: &[u8],
        _mime_type: &str,
        _instruction: &str,
        _schema: &SchemaDescriptor,
    ) -> Result<String> {
        let tag = String::from_utf8_lossy(image).to_string();
        tokio::time::sleep(Duration::from_millis((image.len() % 5) as u64)).await;
        Ok(serde_json::json!({ "size": "M", "shape": tag, "tips": [format!("tip for {}", tag)] }).to_string())
    }

    async fn generate_chat(&self, turns: &[ConversationTurn], system_instruction: &str) -> Result<String> {
        let prompt = turns.last().map(|t| t.text.as_str()).unwrap_or_default();
        self.generate_text(prompt, system_instruction).await
    }
}

/// What the fake Gemini server saw for one request.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub path_and_query: String,
    pub api_key: Option<String>,
    pub body: Value,
}

struct FakeGemini {
    status: StatusCode,
    body: Value,
    delay: Duration,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

async fn fake_generate(
    State(fake): State<Arc<FakeGemini>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    fake.seen.lock().unwrap().push(SeenRequest {
        path_and_query: uri.path_and_query().map(|pq| pq.to_string()).unwrap_or_default(),
        api_key: headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()).map(str::to_string),
        body,
    });
    if !fake.delay.is_zero() {
        tokio::time::sleep(fake.delay).await;
    }
    (fake.status, Json(fake.body.clone()))
}

/// Starts a local stand-in for the Gemini REST API. Returns the base URL
/// (ending in `/v1beta`) and the log of received requests.
pub async fn spawn_fake_gemini(status: StatusCode, body: Value, delay: Duration) -> (String, Arc<Mutex<Vec<SeenRequest>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let fake = Arc::new(FakeGemini { status, body, delay, seen: seen.clone() });
    let app = Router::new().route("/v1beta/models/*rest", post(fake_generate)).with_state(fake);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1beta", addr), seen)
}

pub fn text_candidate(text: &str) -> Value {
    serde_json::json!({
        "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] }, "finishReason": "STOP" }]
    })
}
