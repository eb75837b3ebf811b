use crate::client::CompletionClient;
use crate::config::{self, ClientConfig};
use crate::provider;
use crate::session::{ChatSession, Preset, NOT_CONFIGURED_REPLY};
use anyhow::Context;
use std::io::Write;

pub fn build_client(http: &reqwest::Client, provider_name: &str) -> anyhow::Result<CompletionClient> {
    match provider_name {
        "azure" => {
            #[cfg(feature = "azure")]
            {
                let cfg = ClientConfig::from_env().context("Azure OpenAI configuration is incomplete")?;
                let p = provider::azure::AzureProvider::new(http.clone(), cfg)?;
                Ok(CompletionClient::new(Box::new(p)))
            }
            #[cfg(not(feature = "azure"))]
            {
                let _ = http;
                anyhow::bail!("azure provider is not enabled in this build")
            }
        }
        "echo" => Ok(CompletionClient::new(Box::new(provider::echo::EchoProvider::new()))),
        other => anyhow::bail!("unknown provider: {other}"),
    }
}

/// System message for a fresh session: CLI override, then config file, then default.
pub fn initial_system_message(
    system: Option<String>,
    preset: Option<Preset>,
    cfg: Option<&config::Config>,
) -> Option<String> {
    system
        .or_else(|| preset.map(|p| p.system_message().to_string()))
        .or_else(|| cfg.and_then(|c| c.system_message.clone()))
        .or_else(|| {
            cfg.and_then(|c| c.preset)
                .map(|p| p.system_message().to_string())
        })
}

/// Single exchange with no prior history.
pub async fn cmd_prompt(
    client: &CompletionClient,
    prompt: &str,
    system: Option<String>,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !client.is_configured() {
        anyhow::bail!(NOT_CONFIGURED_REPLY);
    }
    let reply = client.generate_response(prompt, &[], system.as_deref()).await;

    writeln!(out, "{reply}").context("failed to write reply")?;
    Ok(())
}

/// Connectivity indicator followed by the provider's connection details.
pub fn cmd_status(client: &CompletionClient, out: &mut impl Write) -> anyhow::Result<()> {
    let session = ChatSession::new(client);
    writeln!(out, "{}", session.status_line())?;
    for (label, value) in client.details() {
        writeln!(out, "  {label:<12} {value}")?;
    }
    if !session.is_configured() {
        anyhow::bail!("completion endpoint is not configured");
    }
    Ok(())
}
