use super::{ChatRequest, Provider};
use crate::config::ClientConfig;
use crate::conversation::Turn;
use crate::error::{CompletionError, ConfigError};
use futures_core::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on one completion call, connect to last byte.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Error bodies longer than this are cut before they are kept or logged.
const MAX_ERROR_BODY: usize = 1024;

/// Azure OpenAI chat completions over a single deployment.
#[derive(Debug, Clone)]
pub struct AzureProvider {
    http: reqwest::Client,
    config: ClientConfig,
    headers: HeaderMap,
    timeout: Duration,
}

impl AzureProvider {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Result<Self, ConfigError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key =
            HeaderValue::from_str(&config.api_key).map_err(|_| ConfigError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static("api-key"), key);

        tracing::info!(deployment = %config.deployment_name, "Azure OpenAI provider initialized");
        Ok(Self {
            http,
            config,
            headers,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Provider for AzureProvider {
    fn name(&self) -> &'static str {
        "azure"
    }

    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn describe(&self) -> String {
        format!("azure: {}", self.config.deployment_name)
    }

    fn details(&self) -> Vec<(&'static str, String)> {
        vec![
            ("endpoint", self.config.endpoint.clone()),
            ("url", self.config.resolved_url.clone()),
            ("deployment", self.config.deployment_name.clone()),
            ("api version", self.config.api_version.clone()),
            ("api key", self.config.masked_key()),
        ]
    }

    fn complete(&self, req: ChatRequest) -> BoxFuture<'static, Result<String, CompletionError>> {
        let http = self.http.clone();
        let url = self.config.resolved_url.clone();
        let headers = self.headers.clone();
        let timeout = self.timeout;

        Box::pin(async move {
            let body = CompletionRequest {
                messages: req.messages,
                max_completion_tokens: req.max_completion_tokens,
            };

            let resp = http
                .post(&url)
                .headers(headers)
                .timeout(timeout)
                .json(&body)
                .send()
                .await
                .map_err(|e| CompletionError::from_reqwest(e, timeout))?;

            let status = resp.status();
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| CompletionError::from_reqwest(e, timeout))?;

            if status != StatusCode::OK {
                let body = cap_body(&String::from_utf8_lossy(&bytes));
                tracing::error!(%status, %body, "Azure OpenAI API error");
                return Err(CompletionError::Status { status, body });
            }

            let parsed: CompletionResponse =
                serde_json::from_slice(&bytes).map_err(CompletionError::Decode)?;
            extract_content(parsed).ok_or(CompletionError::Empty)
        })
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest {
    messages: Vec<Turn>,
    max_completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

fn cap_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}…", &body[..cut]),
        None => body.to_string(),
    }
}

fn extract_content(r: CompletionResponse) -> Option<String> {
    let choice = r.choices?.into_iter().next()?;
    Some(choice.message.content.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DEPLOYMENT_PATH: &str = "/openai/deployments/gpt-35-turbo/chat/completions";

    fn provider(server: &MockServer) -> AzureProvider {
        let cfg = ClientConfig::new(server.uri(), "test-key", "2024-02-15-preview", "gpt-35-turbo");
        AzureProvider::new(reqwest::Client::new(), cfg).unwrap()
    }

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            messages: vec![Turn::new(Role::System, "sys"), Turn::new(Role::User, prompt)],
            max_completion_tokens: 800,
        }
    }

    #[tokio::test]
    async fn posts_payload_with_api_key_and_trims_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(DEPLOYMENT_PATH))
            .and(query_param("api-version", "2024-02-15-preview"))
            .and(header("api-key", "test-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hello"}
                ],
                "max_completion_tokens": 800
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  Hi there!\n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server).complete(request("hello")).await.unwrap();
        assert_eq!(reply, "Hi there!");
    }

    #[tokio::test]
    async fn empty_choices_is_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(request("x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Empty));
    }

    #[tokio::test]
    async fn absent_choices_is_empty_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "cmpl-1" })))
            .mount(&server)
            .await;

        let err = provider(&server).complete(request("x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Empty));
    }

    #[tokio::test]
    async fn server_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        match provider(&server).complete(request("x")).await {
            Err(CompletionError::Status { status, body }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn long_error_body_is_capped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(5000)))
            .mount(&server)
            .await;

        match provider(&server).complete(request("x")).await {
            Err(CompletionError::Status { body, .. }) => {
                assert_eq!(body.chars().count(), MAX_ERROR_BODY + 1);
                assert!(body.ends_with('…'));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn details_mask_the_key() {
        let cfg = ClientConfig::new("https://res.openai.azure.com", "secret-abcd", "v1", "dep");
        let p = AzureProvider::new(reqwest::Client::new(), cfg).unwrap();
        let details = p.details();
        assert!(details.contains(&(
            "url",
            "https://res.openai.azure.com/openai/deployments/dep/chat/completions?api-version=v1".to_string()
        )));
        assert!(details.contains(&("api key", "***abcd".to_string())));
        assert!(details.iter().all(|(_, v)| !v.contains("secret")));
    }

    #[tokio::test]
    async fn malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider(&server).complete(request("x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({ "choices": [{"message": {"content": "late"}}] })),
            )
            .mount(&server)
            .await;

        let p = provider(&server).with_timeout(Duration::from_millis(50));
        let err = p.complete(request("x")).await.unwrap_err();
        assert!(matches!(err, CompletionError::Timeout(_)), "got {err:?}");
    }

    #[test]
    fn rejects_unprintable_key() {
        let cfg = ClientConfig::new("https://x", "bad\nkey", "v", "d");
        let err = AzureProvider::new(reqwest::Client::new(), cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidApiKey));
    }
}
