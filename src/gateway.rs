use async_trait::async_trait;

use crate::error::{AdvisorError, Result};
use crate::models::{ConversationTurn, Role};
use crate::schema::SchemaDescriptor;

/// The only component that talks to the remote generative model.
///
/// Every method performs at most one outbound call and never retries.
/// Implementations hold no per-call state, so a single instance can be
/// shared behind an `Arc` by any number of concurrent callers.
#[async_trait]
pub trait GenerativeModelGateway: Send + Sync {
    /// Instruction + prompt in, trimmed text out.
    ///
    /// Fails with `Upstream` on transport or status errors and with
    /// `EmptyResponse` when the call succeeds but carries no text.
    async fn generate_text(&self, prompt: &str, system_instruction: &str) -> Result<String>;

    /// Image + instruction + response schema in, raw structured text out.
    ///
    /// The payload is returned verbatim (possibly empty or malformed);
    /// validating it is the caller's job.
    async fn generate_structured(
        &self,
        image: &[u8],
        mime_type: &str,
        instruction: &str,
        schema: &SchemaDescriptor,
    ) -> Result<String>;

    /// Multi-turn variant. Gateways without native chat support answer
    /// from the latest user turn alone.
    async fn generate_chat(&self, turns: &[ConversationTurn], system_instruction: &str) -> Result<String> {
        let prompt = latest_user_prompt(turns)?;
        self.generate_text(prompt, system_instruction).await
    }

    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Text of the final turn, which must come from the user.
pub fn latest_user_prompt(turns: &[ConversationTurn]) -> Result<&str> {
    match turns.last() {
        Some(turn) if turn.role == Role::User && !turn.text.trim().is_empty() => Ok(turn.text.as_str()),
        Some(_) => Err(AdvisorError::InvalidInput("conversation must end with a non-empty user turn".into())),
        None => Err(AdvisorError::InvalidInput("conversation is empty".into())),
    }
}
