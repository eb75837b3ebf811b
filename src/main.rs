mod app;
mod cli;
mod client;
mod config;
mod conversation;
mod error;
mod paths;
mod provider;
mod session;

#[cfg(feature = "tui")]
mod tui;

use anyhow::Context;
use clap::Parser;

#[cfg(feature = "tui")]
fn logs_to_file(args: &cli::Args) -> bool {
    matches!(args.cmd, Some(cli::Command::Tui))
}

#[cfg(not(feature = "tui"))]
fn logs_to_file(_args: &cli::Args) -> bool {
    false
}

fn init_tracing(args: &cli::Args) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    if logs_to_file(args) {
        // The alternate screen owns the terminal; send logs to a file.
        let path = paths::state_dir()?.join("azchat.log");
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = cli::Args::parse();
    init_tracing(&args)?;

    let cfg = match paths::config_dir() {
        Ok(dir) => config::Config::load_optional(dir.join("config.toml"))?,
        Err(e) => {
            tracing::debug!(error = %e, "no config directory, skipping config.toml");
            None
        }
    };
    tracing::debug!(?cfg, "resolved config");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let provider_name = args
        .provider
        .clone()
        .or_else(|| cfg.as_ref().and_then(|c| c.provider.clone()))
        .unwrap_or_else(|| "azure".to_string());

    let client = app::build_client(&http, &provider_name)?;
    let system = app::initial_system_message(args.system.clone(), args.preset, cfg.as_ref());

    match args.cmd {
        #[cfg(feature = "tui")]
        Some(cli::Command::Tui) => {
            return tui::run_tui(&client, system).await;
        }
        Some(cli::Command::Status) => {
            return app::cmd_status(&client, &mut std::io::stdout());
        }
        None => {}
    }

    let prompt = args.prompt.join(" ");
    if prompt.trim().is_empty() {
        anyhow::bail!("No prompt provided. Try: azchat \"Hello\" or `azchat tui`");
    }

    app::cmd_prompt(&client, &prompt, system, &mut std::io::stdout()).await
}
