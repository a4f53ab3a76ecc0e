//! Health probe for the monitored service
//!
//! A probe is two independent checks, a process lookup and an HTTP request.
//! The service is healthy only when both pass. Neither check ever returns an
//! error: anything that prevents confirming health counts as unhealthy.

use crate::manifest::LookoutConfig;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;
use ureq::Agent;

/// Outcome of one probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    /// A process with the configured name is running
    pub process: bool,
    /// The health URL answered 2xx within the timeout
    pub http: bool,
}

impl ProbeReport {
    pub fn healthy(&self) -> bool {
        self.process && self.http
    }
}

impl std::fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mark = |ok: bool| if ok { "ok" } else { "fail" };
        write!(
            f,
            "{} (process:{} http:{})",
            if self.healthy() { "healthy" } else { "unhealthy" },
            mark(self.process),
            mark(self.http)
        )
    }
}

/// Something that can tell whether the service is healthy right now
pub trait HealthProbe {
    /// Run both checks
    fn probe(&self) -> ProbeReport;

    /// Combined verdict
    fn check(&self) -> bool {
        self.probe().healthy()
    }
}

/// Probe backed by `pgrep` and a real HTTP request
pub struct ServiceProbe {
    process_name: String,
    health_url: String,
    timeout: Duration,
    agent: Agent,
}

impl ServiceProbe {
    pub fn new(process_name: &str, health_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .proxy(None)
            .build();

        Self {
            process_name: process_name.to_string(),
            health_url: health_url.to_string(),
            timeout,
            agent: Agent::new_with_config(config),
        }
    }

    pub fn from_config(config: &LookoutConfig) -> Self {
        Self::new(
            &config.plex.process_name,
            &config.plex.http_health_url,
            config.probe_timeout(),
        )
    }

    /// True iff `pgrep -x <name>` finds a match within the timeout
    pub fn process_present(&self) -> bool {
        let mut cmd = Command::new("pgrep");
        cmd.args(["-x", &self.process_name]);

        match run_bounded(&mut cmd, self.timeout) {
            Some(status) => status.success(),
            None => false,
        }
    }

    /// True iff a GET against the health URL returns 2xx within the timeout
    pub fn http_reachable(&self) -> bool {
        match self.agent.get(&self.health_url).call() {
            Ok(response) => {
                let status = response.status();
                debug!(url = %self.health_url, status = status.as_u16(), "health endpoint answered");
                status.is_success()
            }
            Err(e) => {
                debug!(url = %self.health_url, error = %e, "health endpoint unreachable");
                false
            }
        }
    }
}

impl HealthProbe for ServiceProbe {
    fn probe(&self) -> ProbeReport {
        let report = ProbeReport {
            process: self.process_present(),
            http: self.http_reachable(),
        };
        debug!(process = %self.process_name, %report, "probe finished");
        report
    }
}

/// Run a command with null stdio, killing it if it outlives `timeout`
///
/// Returns `None` when the command cannot be spawned, cannot be waited on,
/// or times out.
pub fn run_bounded(cmd: &mut Command, timeout: Duration) -> Option<ExitStatus> {
    let mut child = match cmd
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!(program = ?cmd.get_program(), error = %e, "failed to spawn check command");
            return None;
        }
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait(); // Reap the zombie
                    debug!(program = ?cmd.get_program(), ?timeout, "check command timed out");
                    return None;
                }
                thread::sleep(Duration::from_millis(25));
            }
            Err(e) => {
                debug!(program = ?cmd.get_program(), error = %e, "failed to wait for check command");
                return None;
            }
        }
    }
}
