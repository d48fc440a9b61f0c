//! Hearth console — terminal front-end for the Hearth automation engine.

mod commands;
mod render;
mod session;
mod verbs;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use hearth_core::config::{ConsoleConfig, EngineKind, load_config};
use hearth_core::mock::MockEngine;

use render::TerminalOutput;
use session::Session;

/// Hearth: converse with your home automation engine
#[derive(Parser, Debug)]
#[command(name = "hearth", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Override the prompt string
    #[arg(long)]
    prompt: Option<String>,

    /// Disable ANSI color in conversational output
    #[arg(long)]
    no_color: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "hearth", "hearth")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "hearth.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    // Resolve workspace
    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    // Load configuration
    if !hearth_core::config::config_exists(Some(&workspace)) {
        tracing::debug!("no configuration file found, using defaults");
    }
    let mut config: ConsoleConfig = load_config(Some(&workspace), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    // Apply CLI overrides
    if let Some(prompt) = cli.prompt {
        config.prompt = prompt;
    }
    if cli.no_color {
        config.color = false;
    }

    let engine = match config.engine.kind {
        EngineKind::Loopback => Arc::new(MockEngine::new()),
    };
    let output = Arc::new(TerminalOutput::new(config.color));

    let mut session = Session::new(engine, output, config.prompt)
        .map_err(|e| anyhow::anyhow!("Session startup failed: {}", e))?;
    session.run().await?;
    Ok(())
}
