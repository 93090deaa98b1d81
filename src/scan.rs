use std::fmt;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{AdvisorError, Result};
use crate::gateway::GenerativeModelGateway;
use crate::models::{ImageFormat, ImagePayload, ScanResult};
use crate::schema::SchemaDescriptor;

pub const SCAN_INSTRUCTION: &str = "Analyze this person's body shape and provide clothing size recommendations (S, M, L, XL) and style tips for tech-wear. Return the response as JSON with keys 'size', 'shape', and 'tips'.";

/// Per-call progress of a scan. Only ever logged; nothing is kept between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Capturing,
    AwaitingUpstream,
    Success,
    Failed,
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Capturing => "capturing",
            ScanPhase::AwaitingUpstream => "awaiting_upstream",
            ScanPhase::Success => "success",
            ScanPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Wire contract for the scan reply: `size`, `shape` and `tips` all required.
pub fn scan_schema() -> SchemaDescriptor {
    SchemaDescriptor::object_all_required(vec![
        ("size", SchemaDescriptor::String),
        ("shape", SchemaDescriptor::String),
        ("tips", SchemaDescriptor::array_of(SchemaDescriptor::String)),
    ])
}

/// All-or-nothing decode of the model's structured reply.
pub fn decode_scan_result(raw: &str) -> Result<ScanResult> {
    if raw.trim().is_empty() {
        return Err(AdvisorError::MalformedResponse("empty structured response".into()));
    }
    let result: ScanResult =
        serde_json::from_str(raw).map_err(|e| AdvisorError::MalformedResponse(e.to_string()))?;
    if result.tips.is_empty() {
        return Err(AdvisorError::MalformedResponse("`tips` must contain at least one entry".into()));
    }
    Ok(result)
}

/// Turns one captured frame into a validated size/shape/tips recommendation.
#[derive(Clone)]
pub struct BodyScanAnalyzer {
    gateway: Arc<dyn GenerativeModelGateway>,
    schema: SchemaDescriptor,
}

impl BodyScanAnalyzer {
    pub fn new(gateway: Arc<dyn GenerativeModelGateway>) -> Self {
        Self { gateway, schema: scan_schema() }
    }

    pub async fn analyze(&self, image: ImagePayload) -> Result<ScanResult> {
        info!("📸 Scan phase: {} -> {}", ScanPhase::Idle, ScanPhase::Capturing);

        let format = match ImageFormat::from_mime(&image.mime_type) {
            Some(format) => format,
            None => {
                error!("❌ Scan phase: {} (unsupported format {:?})", ScanPhase::Failed, image.mime_type);
                return Err(AdvisorError::UnsupportedFormat(image.mime_type));
            }
        };
        if image.bytes.is_empty() {
            error!("❌ Scan phase: {} (empty image)", ScanPhase::Failed);
            return Err(AdvisorError::InvalidInput("image is empty".into()));
        }

        info!("📸 Scan phase: {} ({} bytes, {})", ScanPhase::AwaitingUpstream, image.bytes.len(), format);
        let outcome = self
            .gateway
            .generate_structured(&image.bytes, format.mime_type(), SCAN_INSTRUCTION, &self.schema)
            .await
            .map_err(|e| match e {
                AdvisorError::EmptyResponse => AdvisorError::MalformedResponse("empty structured response".into()),
                other => other,
            })
            .and_then(|raw| decode_scan_result(&raw));

        match &outcome {
            Ok(result) => info!(
                "✅ Scan phase: {} (size={}, shape={}, {} tips)",
                ScanPhase::Success,
                result.size,
                result.shape,
                result.tips.len()
            ),
            Err(e) => error!("❌ Scan phase: {} ({}): {}", ScanPhase::Failed, e.kind().as_str(), e),
        }
        outcome
    }
}
