//! Restart action for an unhealthy service
//!
//! Launches the configured command and returns immediately. Whether the
//! restart worked is judged by the next probe, not by the command.

use crate::error::{Error, Result};
use crate::manifest::LookoutConfig;
use std::process::{Command, Stdio};
use tracing::info;

/// Something that can try to bring the service back
pub trait RestartAction {
    /// Issue the relaunch without waiting for the service to come up
    fn attempt_restart(&self) -> Result<()>;
}

/// Restart by spawning a host command, e.g. `open -a "Plex Media Server"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRestart {
    program: String,
    args: Vec<String>,
}

impl CommandRestart {
    /// Build from a program plus arguments
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| Error::Restart("empty restart command".into()))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn from_config(config: &LookoutConfig) -> Result<Self> {
        Self::new(&config.plex.restart_command)
    }

    /// Shell-like rendering for logs
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| {
                if part.contains(char::is_whitespace) {
                    format!("\"{}\"", part)
                } else {
                    part.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl RestartAction for CommandRestart {
    fn attempt_restart(&self) -> Result<()> {
        info!(command = %self.display(), "launching restart command");

        // The child is not waited on; it is reaped when Lookout exits
        Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| Error::Restart(format!("{}: {}", self.display(), e)))
    }
}

/// Stand-in used by `--dry-run`: logs instead of launching
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRestart;

impl RestartAction for NoRestart {
    fn attempt_restart(&self) -> Result<()> {
        info!("dry run: restart command not launched");
        Ok(())
    }
}
