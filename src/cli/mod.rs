// CLI interface
pub mod commands;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use eyelabs_timer::error::{Result, WindowError};
use eyelabs_timer::models::{TimeWindow, WindowRecord};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "eyelabs-timer")]
#[command(about = "Countdown and phase tracking for EyeLabs contests and assignments", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where a window comes from: flags or a backend JSON record
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Start time as ISO-8601 (e.g. 2024-05-01T10:00:00Z)
    #[arg(long, conflicts_with = "record", required_unless_present = "record")]
    pub start: Option<String>,

    /// Duration in minutes
    #[arg(
        long,
        allow_negative_numbers = true,
        conflicts_with = "record",
        required_unless_present = "record"
    )]
    pub duration: Option<f64>,

    /// JSON file holding a contest/assignment record with startTime and durationMinutes
    #[arg(long)]
    pub record: Option<PathBuf>,
}

impl WindowArgs {
    pub fn resolve(&self) -> Result<TimeWindow> {
        if let Some(path) = &self.record {
            tracing::debug!("Reading window record from: {}", path.display());
            let contents = fs::read_to_string(path)?;
            let record: WindowRecord = serde_json::from_str(&contents)?;
            return TimeWindow::try_from(&record);
        }

        match (&self.start, self.duration) {
            (Some(start), Some(duration)) => TimeWindow::parse(start, duration),
            _ => Err(WindowError::InvalidWindow(
                "both --start and --duration are required".to_string(),
            )),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a window once and print its label
    State {
        #[command(flatten)]
        window: WindowArgs,

        /// Evaluate at this instant instead of now (ISO-8601)
        #[arg(long)]
        now: Option<String>,

        /// Output in JSON format for scripting
        #[arg(long)]
        json: bool,

        /// Report the edit action as permitted
        #[arg(long)]
        can_edit: bool,
    },

    /// Follow a window live until it ends
    Watch {
        #[command(flatten)]
        window: WindowArgs,

        /// Tick interval in milliseconds (defaults to the config value)
        #[arg(long)]
        interval_ms: Option<u64>,
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
    ///   eval "$(eyelabs-timer completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(eyelabs-timer completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   eyelabs-timer completions fish > ~/.config/fish/completions/eyelabs-timer.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigCommand {
    /// Write a commented sample config file
    Init,
    /// Show the config file location and whether it is valid
    Path,
}

pub async fn execute(args: Cli) -> Result<()> {
    match args.command {
        Commands::State {
            window,
            now,
            json,
            can_edit,
        } => commands::state::execute(window, now, json, can_edit),
        Commands::Watch {
            window,
            interval_ms,
        } => commands::watch::execute(window, interval_ms).await,
        Commands::Config { command } => commands::config::execute(command),
        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            Ok(())
        }
    }
}
