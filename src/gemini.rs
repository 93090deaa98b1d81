use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use crate::config::GatewayConfig;
use crate::error::{AdvisorError, Result};
use crate::gateway::{latest_user_prompt, GenerativeModelGateway};
use crate::models::{ConversationTurn, ImageFormat, Role};
use crate::schema::SchemaDescriptor;

const API_KEY_HEADER: &str = "x-goog-api-key";

// Shorten inline base64 blobs so request/response bodies stay readable in logs
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        if s.len() > 100 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=') {
                            *val = Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(body: &Value) -> String {
    let mut copy = body.clone();
    truncate_base64_in_json(&mut copy);
    serde_json::to_string(&copy).unwrap_or_default()
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

/// `generateContent` client for the Gemini REST API.
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdvisorError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        if config.api_key.is_none() {
            warn!("⚠️ No GEMINI_API_KEY configured; every model call will fail");
        }

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn perform_api_call(&self, request_body: Value) -> Result<GeminiResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdvisorError::Upstream("missing API key; set GEMINI_API_KEY".into()))?;

        // Key goes in a header, never in the URL
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        info!("🔗 Making request to: {}", url);
        debug!("📤 Request body: {}", loggable(&request_body));

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                let err = AdvisorError::from(e);
                error!("❌ Gemini request failed: {}", err);
                err
            })?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await?;
        if !status.is_success() {
            error!("❌ API Error response ({}): {}", status, response_text);
            return Err(AdvisorError::Upstream(format!("model service returned {}", status)));
        }

        debug!("📥 Raw Gemini API response: {}", response_text);

        serde_json::from_str(&response_text)
            .map_err(|e| AdvisorError::Upstream(format!("unreadable response envelope: {}", e)))
    }

    fn text_request(contents: Value, system_instruction: &str) -> Value {
        let mut body = json!({ "contents": contents });
        if !system_instruction.trim().is_empty() {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_instruction }] });
        }
        body
    }

    fn required_text(&self, parsed: &GeminiResponse) -> Result<String> {
        match extract_text(parsed) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => {
                if let Some(reason) = parsed.prompt_feedback.as_ref().and_then(|f| f.block_reason.as_deref()) {
                    warn!("⚠️ Prompt blocked by model: {}", reason);
                }
                warn!("⚠️ No text content found in response");
                Err(AdvisorError::EmptyResponse)
            }
        }
    }
}

#[async_trait]
impl GenerativeModelGateway for GeminiClient {
    async fn generate_text(&self, prompt: &str, system_instruction: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(AdvisorError::InvalidInput("prompt is empty".into()));
        }

        info!("Generating text with Gemini API...");
        let contents = json!([{ "role": "user", "parts": [{ "text": prompt }] }]);
        let parsed = self.perform_api_call(Self::text_request(contents, system_instruction)).await?;
        self.required_text(&parsed)
    }

    async fn generate_structured(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
        schema: &SchemaDescriptor,
    ) -> Result<String> {
        if image.is_empty() {
            return Err(AdvisorError::InvalidInput("image is empty".into()));
        }
        let format = ImageFormat::from_mime(mime_type)
            .ok_or_else(|| AdvisorError::UnsupportedFormat(mime_type.to_string()))?;

        info!("Generating structured output for {} image ({} bytes)...", format, image.len());
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        let request_body = json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "inlineData": { "mimeType": format.mime_type(), "data": data } },
                    { "text": instruction }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let parsed = self.perform_api_call(request_body).await?;
        let raw = extract_raw_text(&parsed);
        info!("✅ Structured payload received ({} chars)", raw.len());
        Ok(raw)
    }

    async fn generate_chat(&self, turns: &[ConversationTurn], system_instruction: &str) -> Result<String> {
        latest_user_prompt(turns)?;

        info!("Generating chat reply over {} turns...", turns.len());
        let contents: Vec<Value> = turns
            .iter()
            .filter(|turn| !turn.text.trim().is_empty())
            .map(|turn| json!({ "role": wire_role(turn.role), "parts": [{ "text": turn.text }] }))
            .collect();
        let parsed = self.perform_api_call(Self::text_request(Value::Array(contents), system_instruction)).await?;
        self.required_text(&parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(Value),
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

/// Text parts of the first candidate joined as-is; empty when there are none.
fn extract_raw_text(resp: &GeminiResponse) -> String {
    let mut out = String::new();
    if let Some(candidate) = resp.candidates.first() {
        for part in &candidate.content.parts {
            if let Part::Text { text } = part {
                out.push_str(text);
            }
        }
    }
    out
}

/// Concatenated text parts of the first candidate, trimmed.
fn extract_text(resp: &GeminiResponse) -> Option<String> {
    let out = extract_raw_text(resp);
    let trimmed = out.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(raw: &str) -> GeminiResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn extracts_and_joins_text_parts() {
        let resp = parse(r#"{"candidates":[{"content":{"role":"model","parts":[{"text":" Try a "},{"text":"tech-tee. "}]}}]}"#);
        assert_eq!(extract_text(&resp).as_deref(), Some("Try a tech-tee."));
    }

    #[test]
    fn ignores_non_text_parts() {
        let resp = parse(r#"{"candidates":[{"content":{"parts":[{"inlineData":{"mimeType":"image/png","data":"AAAA"}},{"text":"ok"}]}}]}"#);
        assert_eq!(extract_text(&resp).as_deref(), Some("ok"));
    }

    #[test]
    fn empty_or_missing_candidates_yield_nothing() {
        assert_eq!(extract_text(&parse(r#"{"candidates":[]}"#)), None);
        assert_eq!(extract_text(&parse(r#"{}"#)), None);
        assert_eq!(extract_text(&parse(r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#)), None);
        assert_eq!(extract_text(&parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)), None);
    }

    #[test]
    fn raw_text_keeps_whitespace_and_part_boundaries() {
        let resp = parse(r#"{"candidates":[{"content":{"parts":[{"text":"  {\"size\":"},{"text":"\"M\"}\n"}]}}]}"#);
        assert_eq!(extract_raw_text(&resp), "  {\"size\":\"M\"}\n");
        assert_eq!(extract_raw_text(&parse(r#"{"candidates":[]}"#)), "");
    }

    #[test]
    fn block_reason_is_read() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(resp.prompt_feedback.unwrap().block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn long_inline_data_is_truncated_for_logs() {
        let blob = "A".repeat(400);
        let body = json!({ "contents": [{ "parts": [{ "inlineData": { "mimeType": "image/jpeg", "data": blob } }] }] });
        let logged = loggable(&body);
        assert!(logged.contains("[truncated 350 chars]"));
        assert!(!logged.contains(&"A".repeat(100)));
    }

    #[test]
    fn system_instruction_is_omitted_when_blank() {
        let body = GeminiClient::text_request(json!([]), "  ");
        assert!(body.get("systemInstruction").is_none());
        let body = GeminiClient::text_request(json!([]), "be brief");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn assistant_turns_map_to_model_role() {
        assert_eq!(wire_role(Role::Assistant), "model");
        assert_eq!(wire_role(Role::User), "user");
    }
}
