use crate::error::ConfigError;
use crate::session::Preset;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const ENV_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const ENV_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const ENV_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";
pub const ENV_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_DEPLOYMENT_NAME: &str = "gpt-35-turbo";

/// User preferences read from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// System message used when no override is given on the command line.
    pub system_message: Option<String>,

    /// Preset applied at startup; `system_message` wins if both are set.
    pub preset: Option<Preset>,

    /// Provider identifier ("azure" or "echo").
    pub provider: Option<String>,
}

impl Config {
    /// Load config if the file exists, otherwise return Ok(None).
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        let s = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let cfg: Config = toml::from_str(&s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(cfg))
    }
}

/// Connection settings for the Azure OpenAI deployment.
///
/// `resolved_url` is computed once here and reused for every request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment_name: String,
    pub resolved_url: String,
}

impl ClientConfig {
    /// Build without validation. Use [`ClientConfig::from_env`] at startup.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_version: impl Into<String>,
        deployment_name: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        let api_version = api_version.into();
        let deployment_name = deployment_name.into();
        let resolved_url = resolve_url(&endpoint, &deployment_name, &api_version);
        Self {
            endpoint,
            api_key: api_key.into(),
            api_version,
            deployment_name,
            resolved_url,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve settings through `lookup`. Endpoint and key are mandatory.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let endpoint = non_empty(ENV_ENDPOINT);
        let api_key = non_empty(ENV_API_KEY);
        let api_version = non_empty(ENV_API_VERSION).unwrap_or_else(|| DEFAULT_API_VERSION.to_string());
        let deployment_name =
            non_empty(ENV_DEPLOYMENT_NAME).unwrap_or_else(|| DEFAULT_DEPLOYMENT_NAME.to_string());

        tracing::info!(
            endpoint = endpoint.as_deref().unwrap_or("None"),
            api_key = %api_key.as_deref().map(mask_key).unwrap_or_else(|| "None".to_string()),
            %api_version,
            deployment = %deployment_name,
            "loading Azure OpenAI configuration"
        );

        let Some(endpoint) = endpoint else {
            tracing::error!("missing required Azure OpenAI endpoint");
            return Err(ConfigError::MissingEndpoint);
        };
        let Some(api_key) = api_key else {
            tracing::error!("missing required Azure OpenAI API key");
            return Err(ConfigError::MissingApiKey);
        };

        let cfg = Self::new(endpoint, api_key, api_version, deployment_name);
        tracing::info!(url = %cfg.resolved_url, "using API URL");
        Ok(cfg)
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.api_key.is_empty() && !self.resolved_url.is_empty()
    }

    pub fn masked_key(&self) -> String {
        mask_key(&self.api_key)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.masked_key())
            .field("api_version", &self.api_version)
            .field("deployment_name", &self.deployment_name)
            .field("resolved_url", &self.resolved_url)
            .finish()
    }
}

/// An endpoint that already names a completions path is used verbatim.
fn resolve_url(endpoint: &str, deployment_name: &str, api_version: &str) -> String {
    if endpoint.is_empty() || endpoint.contains("chat/completions") {
        return endpoint.to_string();
    }
    format!(
        "{}/openai/deployments/{deployment_name}/chat/completions?api-version={api_version}",
        endpoint.trim_end_matches('/')
    )
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn builds_deployment_url_with_defaults() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "https://res.openai.azure.com/"),
            (ENV_API_KEY, "secret-key-1234"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_version, DEFAULT_API_VERSION);
        assert_eq!(cfg.deployment_name, DEFAULT_DEPLOYMENT_NAME);
        assert_eq!(
            cfg.resolved_url,
            "https://res.openai.azure.com/openai/deployments/gpt-35-turbo/chat/completions?api-version=2024-02-15-preview"
        );
        assert!(cfg.is_configured());
    }

    #[test]
    fn honours_explicit_version_and_deployment() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            (ENV_ENDPOINT, "https://res.openai.azure.com"),
            (ENV_API_KEY, "k"),
            (ENV_API_VERSION, "2025-01-01"),
            (ENV_DEPLOYMENT_NAME, "gpt-4o"),
        ]))
        .unwrap();
        assert_eq!(
            cfg.resolved_url,
            "https://res.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2025-01-01"
        );
    }

    #[test]
    fn full_completions_url_is_used_verbatim() {
        let url = "https://res.openai.azure.com/openai/deployments/x/chat/completions?api-version=1";
        let cfg = ClientConfig::from_lookup(lookup(&[(ENV_ENDPOINT, url), (ENV_API_KEY, "k")])).unwrap();
        assert_eq!(cfg.resolved_url, url);
    }

    #[test]
    fn missing_endpoint_or_key_is_fatal() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_API_KEY, "k")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoint));

        let err = ClientConfig::from_lookup(lookup(&[(ENV_ENDPOINT, "https://x"), (ENV_API_KEY, "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
    }

    #[test]
    fn is_configured_false_when_endpoint_or_key_empty() {
        assert!(!ClientConfig::new("", "k", "v", "d").is_configured());
        assert!(!ClientConfig::new("https://x", "", "v", "d").is_configured());
        assert!(ClientConfig::new("https://x", "k", "v", "d").is_configured());
    }

    #[test]
    fn debug_masks_key() {
        let cfg = ClientConfig::new("https://x", "super-secret-abcd", "v", "d");
        let dbg = format!("{cfg:?}");
        assert!(dbg.contains("***abcd"));
        assert!(!dbg.contains("super-secret"));
        assert_eq!(mask_key("ab"), "***ab");
    }

    #[test]
    fn load_optional_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_optional(dir.path().join("config.toml")).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn load_optional_parses_preferences() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "system_message = \"Be brief.\"\npreset = \"engineering\"\nprovider = \"echo\"\n",
        )
        .unwrap();
        let cfg = Config::load_optional(&path).unwrap().unwrap();
        assert_eq!(cfg.system_message.as_deref(), Some("Be brief."));
        assert_eq!(cfg.preset, Some(Preset::Engineering));
        assert_eq!(cfg.provider.as_deref(), Some("echo"));
    }

    #[test]
    fn load_optional_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "system_message = [").unwrap();
        let err = Config::load_optional(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
