use crate::conversation::{Role, Turn};
use crate::error::CompletionError;
use crate::provider::{ChatRequest, Provider};

/// Number of most recent history turns forwarded with each request.
pub const HISTORY_WINDOW: usize = 10;

pub const MAX_COMPLETION_TOKENS: u32 = 800;

pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are a helpful AI assistant. Provide clear, concise, and helpful responses.";

/// Builds completion payloads and hands them to a [`Provider`].
///
/// Holds no conversation state; callers own the history.
pub struct CompletionClient {
    provider: Box<dyn Provider + Send + Sync>,
}

impl CompletionClient {
    pub fn new(provider: Box<dyn Provider + Send + Sync>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }

    pub fn describe(&self) -> String {
        self.provider.describe()
    }

    pub fn details(&self) -> Vec<(&'static str, String)> {
        self.provider.details()
    }

    /// System turn, the last [`HISTORY_WINDOW`] turns of `history`, then the
    /// new user turn.
    pub fn build_request(
        &self,
        user_message: &str,
        history: &[Turn],
        system_message: Option<&str>,
    ) -> ChatRequest {
        let recent = &history[history.len().saturating_sub(HISTORY_WINDOW)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(Turn::new(
            Role::System,
            system_message.unwrap_or(DEFAULT_SYSTEM_MESSAGE),
        ));
        messages.extend(recent.iter().cloned());
        messages.push(Turn::new(Role::User, user_message));

        ChatRequest {
            messages,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
        }
    }

    pub async fn try_generate(
        &self,
        user_message: &str,
        history: &[Turn],
        system_message: Option<&str>,
    ) -> Result<String, CompletionError> {
        let req = self.build_request(user_message, history, system_message);
        tracing::info!(
            provider = self.provider.name(),
            messages = req.messages.len(),
            "requesting completion"
        );

        let res = self.provider.complete(req).await;
        match &res {
            Ok(reply) => {
                tracing::info!(chars = reply.chars().count(), "successfully generated response")
            }
            Err(CompletionError::Empty) => tracing::warn!("no response generated"),
            Err(e) => tracing::error!(error = %e, "error generating response"),
        }
        res
    }

    /// Like [`CompletionClient::try_generate`], but every failure is replaced
    /// by its user-facing fallback text.
    pub async fn generate_response(
        &self,
        user_message: &str,
        history: &[Turn],
        system_message: Option<&str>,
    ) -> String {
        match self.try_generate(user_message, history, system_message).await {
            Ok(reply) => reply,
            Err(e) => e.user_message().to_string(),
        }
    }
}
