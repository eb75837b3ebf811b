use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Reply used when the endpoint answered but produced nothing usable.
pub const EMPTY_COMPLETION_REPLY: &str =
    "I apologize, but I couldn't generate a response at the moment. Please try again.";

/// Reply used for every transport, status or decoding failure.
pub const TECHNICAL_DIFFICULTIES_REPLY: &str =
    "I'm sorry, I'm experiencing some technical difficulties. Please try again in a moment.";

/// Startup configuration errors. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing AZURE_OPENAI_ENDPOINT")]
    MissingEndpoint,

    #[error("missing AZURE_OPENAI_API_KEY")]
    MissingApiKey,

    #[error("API key is not a valid header value")]
    InvalidApiKey,

    #[error("failed to read config: {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Why a completion call produced no reply.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// `body` is kept for inspection but left out of `Display`; the
    /// provider logs it once.
    #[error("HTTP {status}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("response carried no choices")]
    Empty,
}

impl CompletionError {
    /// Text shown to the user in place of a reply. Never carries internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            CompletionError::Empty => EMPTY_COMPLETION_REPLY,
            CompletionError::Timeout(_)
            | CompletionError::Transport(_)
            | CompletionError::Status { .. }
            | CompletionError::Decode(_) => TECHNICAL_DIFFICULTIES_REPLY,
        }
    }

    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            CompletionError::Timeout(timeout)
        } else {
            CompletionError::Transport(err)
        }
    }
}
