use std::sync::Arc;
use tracing::{error, info, warn};

use crate::error::{AdvisorError, Result};
use crate::gateway::GenerativeModelGateway;
use crate::models::ConversationTurn;

pub const STYLIST_INSTRUCTION: &str = "You are the MNFP AI Fashion Expert. You are helpful, trendy, and knowledgeable about modern street style and tech-wear. Keep responses concise.";
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't process that.";
pub const GREETING: &str = "Hello! I am your MNFP AI Stylist. How can I help you today?";

/// Whether prior turns are forwarded to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Answer from the latest query alone.
    #[default]
    LatestOnly,
    /// Send the full conversation, latest query last.
    Threaded,
}

/// Chat stylist: one query in, one recommendation out.
#[derive(Clone)]
pub struct ConversationAdvisor {
    gateway: Arc<dyn GenerativeModelGateway>,
    history_mode: HistoryMode,
}

impl ConversationAdvisor {
    pub fn new(gateway: Arc<dyn GenerativeModelGateway>) -> Self {
        Self { gateway, history_mode: HistoryMode::default() }
    }

    pub fn with_history_mode(mut self, mode: HistoryMode) -> Self {
        self.history_mode = mode;
        self
    }

    pub fn greeting(&self) -> &'static str {
        GREETING
    }

    /// Returns the model's reply, or `FALLBACK_REPLY` when it produced no text.
    /// Only upstream failures and blank queries reach the caller as errors.
    pub async fn advise(&self, query: &str, history: &[ConversationTurn]) -> Result<String> {
        if query.trim().is_empty() {
            return Err(AdvisorError::InvalidInput("query is empty".into()));
        }

        info!("💬 Advising on query ({} chars, {} prior turns, {:?})", query.len(), history.len(), self.history_mode);

        let outcome = match self.history_mode {
            HistoryMode::LatestOnly => self.gateway.generate_text(query, STYLIST_INSTRUCTION).await,
            HistoryMode::Threaded => {
                let mut turns = history.to_vec();
                turns.push(ConversationTurn::user(query));
                self.gateway.generate_chat(&turns, STYLIST_INSTRUCTION).await
            }
        };

        match outcome {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) | Err(AdvisorError::EmptyResponse) => {
                warn!("⚠️ Empty model reply, substituting fallback");
                Ok(FALLBACK_REPLY.to_string())
            }
            Err(e) => {
                error!("❌ Advice generation failed: {}", e);
                Err(e)
            }
        }
    }
}
