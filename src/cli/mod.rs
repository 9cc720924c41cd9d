// CLI interface
pub mod commands;

use crate::config::Config;
use crate::error::Result;
use crate::models::LeaseRecord;
use crate::source;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "leasetimer")]
#[command(about = "Live countdowns for car leases", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Lease file (JSON array or API response with a "lease" list)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every lease with its current countdown
    List {
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,

        /// Only show leases whose car model or brand contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Stream countdowns as JSON lines, one per tick
    Watch {
        /// Stop after this many ticks (runs until Ctrl+C otherwise)
        #[arg(short = 'n', long)]
        ticks: Option<u64>,

        /// Lease feed events (JSON lines) to apply before starting
        #[arg(long)]
        events: Option<PathBuf>,

        /// Only show leases whose car model or brand contains this text
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Summarize leases by status
    Status {
        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(leasetimer completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(leasetimer completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   leasetimer completions fish > ~/.config/fish/completions/leasetimer.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a commented sample config file
    Init,
    /// Show where the config file lives and whether it is valid
    Path,
    /// Print the effective configuration
    Show,
}

#[derive(Debug, Clone, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Resolve the lease file and load it
pub(crate) fn load_leases(file: Option<PathBuf>, config: &Config) -> Result<Vec<LeaseRecord>> {
    let path = config.source_path(file)?;
    source::load_leases(&path)
}

pub async fn execute(args: Cli) -> Result<()> {
    match args.command {
        Some(Commands::Completions { shell }) => {
            commands::completions::execute(shell);
            Ok(())
        }
        Some(Commands::Config { command }) => commands::config::execute(command),
        Some(Commands::List { format, search }) => {
            let config = Config::load()?;
            commands::list::execute(&config, args.file, &format, search.as_deref())
        }
        Some(Commands::Watch {
            ticks,
            events,
            search,
        }) => {
            let config = Config::load()?;
            commands::watch::execute(&config, args.file, ticks, events, search).await
        }
        Some(Commands::Status { json }) => {
            let config = Config::load()?;
            commands::status::execute(&config, args.file, json)
        }
        None => {
            let config = Config::load()?;
            if crate::env::is_interactive_terminal() {
                // No command specified, launch TUI
                use crate::ui::App;
                let mut app = App::new(&config, args.file)?;
                app.run().await
            } else {
                tracing::info!("No interactive terminal, printing leases instead of the TUI");
                commands::list::execute(&config, args.file, "text", None)
            }
        }
    }
}
