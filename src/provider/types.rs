use crate::conversation::Turn;
use crate::error::CompletionError;
use futures_core::future::BoxFuture;

/// Fully assembled payload for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
    pub max_completion_tokens: u32,
}

impl ChatRequest {
    /// Content of the trailing user turn.
    pub fn prompt(&self) -> &str {
        self.messages.last().map(|t| t.content.as_str()).unwrap_or_default()
    }
}

/// Provider interface.
///
/// One request in, one reply or a typed failure out. No streaming.
pub trait Provider {
    fn name(&self) -> &'static str;

    /// Whether calls can be attempted at all.
    fn is_configured(&self) -> bool;

    /// Short text for the status line (deployment, mode).
    fn describe(&self) -> String;

    /// Labelled connection details for `azchat status`. Secrets come masked.
    fn details(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    fn complete(&self, req: ChatRequest) -> BoxFuture<'static, Result<String, CompletionError>>;
}
