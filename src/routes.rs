use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::{
    advisor::ConversationAdvisor,
    error::AdvisorError,
    gateway::GenerativeModelGateway,
    models::{ChatReply, ChatRequest, ErrorBody, HealthResponse, ImageFormat, ImagePayload, ScanRequest, ScanResult},
    scan::BodyScanAnalyzer,
};

#[derive(Clone)]
pub struct AppState {
    pub advisor: ConversationAdvisor,
    pub analyzer: BodyScanAnalyzer,
    pub model: String,
}

impl AppState {
    pub fn new(gateway: Arc<dyn GenerativeModelGateway>, advisor: ConversationAdvisor) -> Self {
        Self {
            model: gateway.model_name().to_string(),
            analyzer: BodyScanAnalyzer::new(gateway),
            advisor,
        }
    }
}

impl IntoResponse for AdvisorError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdvisorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AdvisorError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AdvisorError::Upstream(_) | AdvisorError::MalformedResponse(_) | AdvisorError::EmptyResponse => {
                StatusCode::BAD_GATEWAY
            }
        };
        let body = ErrorBody { error: self.kind().as_str().to_string(), message: self.to_string() };
        (status, Json(body)).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/greeting", get(greeting))
        .route("/api/scan", post(scan))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok".to_string(), model: state.model.clone() })
}

pub async fn greeting(State(state): State<AppState>) -> Json<ChatReply> {
    Json(ChatReply { reply: state.advisor.greeting().to_string(), correlation_id: None, created_at: Utc::now() })
}

pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Result<Json<ChatReply>, AdvisorError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, correlation_id = ?body.correlation_id, "🚀 Chat request");

    let reply = state.advisor.advise(&body.message, &body.history).await?;

    tracing::info!(%request_id, "✅ Chat reply ready ({} chars)", reply.len());
    Ok(Json(ChatReply { reply, correlation_id: body.correlation_id, created_at: Utc::now() }))
}

pub async fn scan(State(state): State<AppState>, Json(body): Json<ScanRequest>) -> Result<Json<ScanResult>, AdvisorError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, mime_type = %body.mime_type, "🚀 Scan request ({} base64 chars)", body.data.len());

    let (mime_type, encoded) = resolve_image_data(&body.mime_type, &body.data)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| AdvisorError::InvalidInput(format!("image data is not valid base64: {}", e)))?;

    let result = state.analyzer.analyze(ImagePayload::new(bytes, mime_type)).await?;
    tracing::info!(%request_id, "✅ Scan complete");
    Ok(Json(result))
}

/// Splits a browser data URL (`data:image/jpeg;base64,...`) into its MIME type
/// and payload. The declared type may be blank, otherwise it must agree with the URL.
fn resolve_image_data<'a>(declared: &str, data: &'a str) -> Result<(String, &'a str), AdvisorError> {
    let declared = declared.trim();
    let Some(rest) = data.trim_start().strip_prefix("data:") else {
        return Ok((declared.to_string(), data));
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| AdvisorError::InvalidInput("data URL has no payload".into()))?;
    let url_mime = header.split(';').next().unwrap_or_default().trim();

    if url_mime.is_empty() {
        return Ok((declared.to_string(), payload));
    }
    if declared.is_empty() {
        return Ok((url_mime.to_string(), payload));
    }
    let same = match (ImageFormat::from_mime(declared), ImageFormat::from_mime(url_mime)) {
        (Some(a), Some(b)) => a == b,
        _ => declared.eq_ignore_ascii_case(url_mime),
    };
    if !same {
        return Err(AdvisorError::InvalidInput(format!(
            "mime_type {} does not match data URL type {}",
            declared, url_mime
        )));
    }
    Ok((declared.to_string(), payload))
}
