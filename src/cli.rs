//! Command-line interface for Lookout
//!
//! Uses clap with derive for type-safe CLI parsing

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

/// Lookout - single-service health monitor with auto-restart and SMS alerts
#[derive(Parser)]
#[command(name = "lookout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path (.json or .toml)
    #[arg(short, long, global = true, default_value = "config.json")]
    pub config: PathBuf,

    /// State file path (defaults to state.json beside the config file)
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run one monitoring cycle (default)
    Check {
        /// Decide and log only: no SMS, no restart, state left untouched
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the persisted state and open windows
    Status {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Probe the service once and print the result
    Probe,

    /// Reset the persisted state to defaults
    Reset,

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run, `check` when none was given
    pub fn action(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Check { dry_run: false })
    }

    /// Explicit `--state`, or `state.json` next to the config file
    pub fn state_path(&self) -> PathBuf {
        match &self.state {
            Some(path) => path.clone(),
            None => default_state_path(&self.config),
        }
    }

    /// Generate shell completion scripts
    pub fn generate_completion(shell: Shell) {
        let mut cmd = Self::command();
        clap_complete::generate(shell, &mut cmd, "lookout", &mut std::io::stdout());
    }
}

fn default_state_path(config: &Path) -> PathBuf {
    config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|dir| dir.join("state.json"))
        .unwrap_or_else(|| PathBuf::from("state.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_check() {
        let cli = Cli::try_parse_from(["lookout"]).unwrap();
        assert!(matches!(cli.action(), Commands::Check { dry_run: false }));
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.state_path(), PathBuf::from("state.json"));
    }

    #[test]
    fn test_state_defaults_beside_config() {
        let cli = Cli::try_parse_from(["lookout", "-c", "/opt/lookout/config.json", "status"]).unwrap();
        assert_eq!(cli.state_path(), PathBuf::from("/opt/lookout/state.json"));
        assert!(matches!(cli.action(), Commands::Status { json: false }));
    }

    #[test]
    fn test_explicit_state_and_flags() {
        let cli = Cli::try_parse_from([
            "lookout",
            "check",
            "--dry-run",
            "--state",
            "/var/lib/lookout/state.json",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.action(), Commands::Check { dry_run: true }));
        assert_eq!(cli.state_path(), PathBuf::from("/var/lib/lookout/state.json"));
    }
}
