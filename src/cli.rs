use crate::session::Preset;
use clap::{Parser, Subcommand};

/// Chat with an Azure OpenAI deployment from the terminal
#[derive(Debug, Parser)]
#[command(name = "azchat")]
#[command(version)]
#[command(about = "Chat with an Azure OpenAI deployment", long_about = None)]
pub struct Args {
    /// Provider (default: config/provider or "azure")
    #[arg(long = "provider")]
    pub provider: Option<String>,

    /// System message override for this run
    #[arg(long = "system", value_name = "TEXT", conflicts_with = "preset")]
    pub system: Option<String>,

    /// Use a built-in system message
    #[arg(long = "preset", value_enum)]
    pub preset: Option<Preset>,

    #[command(subcommand)]
    pub cmd: Option<Command>,

    /// Prompt text (positional) (used when no subcommand is given)
    #[arg(value_name = "PROMPT")]
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run an interactive terminal chat UI
    #[cfg(feature = "tui")]
    Tui,

    /// Show whether the completion endpoint is configured
    Status,
}
