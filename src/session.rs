use crate::client::{CompletionClient, DEFAULT_SYSTEM_MESSAGE};
use crate::conversation::{Conversation, Role, Turn};
use serde::{Deserialize, Serialize};

/// Shown instead of a reply when the client cannot make calls.
pub const NOT_CONFIGURED_REPLY: &str =
    "Azure OpenAI is not configured. Set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY and restart.";

/// Fixed system messages selectable from the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    General,
    Engineering,
}

impl Preset {
    pub fn system_message(self) -> &'static str {
        match self {
            Preset::General => DEFAULT_SYSTEM_MESSAGE,
            Preset::Engineering => {
                "You are a senior software engineer. Give precise, technically accurate answers \
                 with short code examples where they help, and say so when you are unsure."
            }
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "general" => Some(Preset::General),
            "engineering" => Some(Preset::Engineering),
            _ => None,
        }
    }
}

/// State of one chat session: the transcript plus an optional system
/// message override. Borrows the client from the composition root.
pub struct ChatSession<'a> {
    client: &'a CompletionClient,
    conversation: Option<Conversation>,
    system_message: Option<String>,
}

impl<'a> ChatSession<'a> {
    pub fn new(client: &'a CompletionClient) -> Self {
        Self {
            client,
            conversation: None,
            system_message: None,
        }
    }

    fn conversation(&mut self) -> &mut Conversation {
        Conversation::initialize(&mut self.conversation)
    }

    pub fn history(&self) -> &[Turn] {
        self.conversation
            .as_ref()
            .map(Conversation::get_all)
            .unwrap_or_default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.conversation.as_ref().and_then(Conversation::session_id)
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    pub fn status_line(&self) -> String {
        if self.is_configured() {
            format!("● connected ({})", self.client.describe())
        } else {
            "○ not configured".to_string()
        }
    }

    pub fn system_message(&self) -> &str {
        self.system_message.as_deref().unwrap_or(DEFAULT_SYSTEM_MESSAGE)
    }

    /// Applies to later calls only. `None` restores the default.
    pub fn set_system_message(&mut self, message: Option<String>) {
        self.system_message = message.filter(|m| !m.trim().is_empty());
        tracing::debug!(system_message = self.system_message(), "system message updated");
    }

    pub fn apply_preset(&mut self, preset: Preset) {
        self.set_system_message(Some(preset.system_message().to_string()));
    }

    pub fn clear(&mut self) {
        if let Some(c) = self.conversation.as_mut() {
            c.clear();
        }
        tracing::info!("chat history cleared");
    }

    /// Record `prompt`, ask for a reply and record that too.
    ///
    /// The user turn is appended before the call, so it is also the newest
    /// history entry the client forwards.
    pub async fn submit(&mut self, prompt: &str) -> String {
        let conversation = self.conversation();
        if conversation.session_id().is_none() {
            conversation.set_session_id(new_session_id());
        }
        conversation.append(Role::User, prompt);
        tracing::debug!(
            session = conversation.session_id().unwrap_or_default(),
            turns = conversation.len(),
            "user turn recorded"
        );

        let reply = if self.client.is_configured() {
            match self
                .client
                .try_generate(prompt, self.history(), self.system_message.as_deref())
                .await
            {
                Ok(reply) => reply,
                Err(e) => e.user_message().to_string(),
            }
        } else {
            tracing::warn!("completion client not configured; skipping request");
            NOT_CONFIGURED_REPLY.to_string()
        };

        self.conversation().append(Role::Assistant, reply.clone());
        reply
    }
}

fn new_session_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}
