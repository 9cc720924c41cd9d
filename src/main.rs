// leasetimer - live lease countdowns

mod cli;
mod config;
mod countdown;
mod env;
mod error;
mod expiry;
mod models;
mod search;
mod source;
mod ui;

use anyhow::Context;
use clap::Parser;
use std::fs::OpenOptions;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first to get verbose flag
    let args = cli::Cli::parse();

    let log_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(log_level.into());

    if args.command.is_none() && env::is_interactive_terminal() {
        // For TUI mode, write logs to a file to avoid breaking the UI
        let log_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("leasetimer");
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

        let log_file = log_dir.join("leasetimer.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(file.with_max_level(tracing::Level::TRACE))
            .with_ansi(false) // No color codes in file
            .init();
    } else {
        // CLI commands log to stderr so stdout stays clean for output
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    cli::execute(args).await?;
    Ok(())
}
