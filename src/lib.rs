//! Advisory client for the MNFP fashion app: a chat stylist and a body-scan
//! size analyzer, both backed by a single injected generative-model gateway.

pub mod advisor;
pub mod config;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod models;
pub mod routes;
pub mod scan;
pub mod schema;

pub use advisor::{ConversationAdvisor, HistoryMode};
pub use config::GatewayConfig;
pub use error::{AdvisorError, ErrorKind, Result};
pub use gateway::GenerativeModelGateway;
pub use gemini::GeminiClient;
pub use models::{ConversationTurn, ImageFormat, ImagePayload, Role, ScanResult};
pub use scan::BodyScanAnalyzer;
pub use schema::SchemaDescriptor;
