use super::{ChatRequest, Provider};
use crate::error::CompletionError;
use futures_core::future::BoxFuture;

/// Offline provider that repeats the prompt back. Useful without credentials.
#[derive(Debug, Default, Clone)]
pub struct EchoProvider;

impl EchoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Provider for EchoProvider {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn is_configured(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        "echo (offline)".to_string()
    }

    fn complete(&self, req: ChatRequest) -> BoxFuture<'static, Result<String, CompletionError>> {
        let reply = format!("You said: {}", req.prompt());
        Box::pin(async move { Ok(reply) })
    }
}
