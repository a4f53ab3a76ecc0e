//! Configuration file parsing for Lookout
//!
//! Parses `config.json` (or a `.toml` equivalent) using serde. Everything
//! except the Twilio credentials has a default, so a minimal config only
//! needs `account_sid`, `auth_token`, `from_number` and `to_number`.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Load and validate configuration from a file
pub fn load(path: &Path) -> Result<LookoutConfig> {
    let content = fs::read_to_string(path).map_err(|e| Error::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config = parse(&content, ConfigFormat::from_path(path))?;
    config.validate()?;

    Ok(config)
}

/// Parse configuration text without validating it
pub fn parse(content: &str, format: ConfigFormat) -> Result<LookoutConfig> {
    match format {
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
        }
        ConfigFormat::Toml => Ok(toml::from_str(content)?),
    }
}

/// On-disk config syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.toml` files are TOML, everything else is JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct LookoutConfig {
    /// The monitored service
    #[serde(default)]
    pub plex: ServiceConfig,

    /// Host name appended to "appears DOWN" alerts
    #[serde(default)]
    pub host_label: Option<String>,

    /// Minimum minutes between ordinary down alerts
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown_minutes: u64,

    /// Minutes of silence after an auto-restart failed
    #[serde(default = "default_suppress")]
    pub suppress_minutes_after_failed_retry: u64,

    /// Minimum minutes between auto-restart attempts
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_minutes: u64,

    /// Timeout for each probe (pgrep and HTTP)
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    /// Wait between launching a restart and re-probing
    #[serde(default = "default_restart_grace")]
    pub restart_grace_seconds: u64,

    /// Messaging provider settings
    #[serde(flatten)]
    pub twilio: TwilioConfig,
}

/// Monitored service definition
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Exact process name passed to `pgrep -x`
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Endpoint that must answer 2xx
    #[serde(default = "default_health_url")]
    pub http_health_url: String,

    /// Name used in alert messages
    #[serde(default = "default_display_name")]
    pub display_name: String,

    /// Command (program plus arguments) that relaunches the service
    #[serde(default = "default_restart_command")]
    pub restart_command: Vec<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            http_health_url: default_health_url(),
            display_name: default_display_name(),
            restart_command: default_restart_command(),
        }
    }
}

/// Twilio credentials and destination
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,

    /// REST API base URL
    #[serde(default = "default_twilio_api_base")]
    pub twilio_api_base: String,

    /// Timeout for the SMS request
    #[serde(default = "default_notify_timeout")]
    pub notify_timeout_seconds: u64,
}

impl TwilioConfig {
    /// Timeout for the SMS request as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_seconds)
    }
}

fn default_process_name() -> String {
    "Plex Media Server".to_string()
}

fn default_health_url() -> String {
    "http://127.0.0.1:32400/identity".to_string()
}

fn default_display_name() -> String {
    "Plex".to_string()
}

fn default_restart_command() -> Vec<String> {
    vec![
        "open".to_string(),
        "-a".to_string(),
        "Plex Media Server".to_string(),
    ]
}

fn default_alert_cooldown() -> u64 {
    60
}

fn default_suppress() -> u64 {
    120
}

fn default_retry_backoff() -> u64 {
    15
}

fn default_probe_timeout() -> u64 {
    3
}

fn default_restart_grace() -> u64 {
    8
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

fn default_notify_timeout() -> u64 {
    10
}

impl LookoutConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let credentials = [
            ("account_sid", &self.twilio.account_sid),
            ("auth_token", &self.twilio.auth_token),
            ("from_number", &self.twilio.from_number),
            ("to_number", &self.twilio.to_number),
        ];
        for (key, value) in credentials {
            if value.trim().is_empty() {
                return Err(Error::ConfigValidation(format!("'{}' must not be empty", key)));
            }
        }

        if self.plex.process_name.trim().is_empty() {
            return Err(Error::ConfigValidation(
                "'plex.process_name' must not be empty".into(),
            ));
        }

        if !is_http_url(&self.plex.http_health_url) {
            return Err(Error::ConfigValidation(format!(
                "'plex.http_health_url' must be an http(s) URL, got '{}'",
                self.plex.http_health_url
            )));
        }

        if !is_http_url(&self.twilio.twilio_api_base) {
            return Err(Error::ConfigValidation(format!(
                "'twilio_api_base' must be an http(s) URL, got '{}'",
                self.twilio.twilio_api_base
            )));
        }

        if self
            .plex
            .restart_command
            .first()
            .is_none_or(|program| program.trim().is_empty())
        {
            return Err(Error::ConfigValidation(
                "'plex.restart_command' must name a program".into(),
            ));
        }

        if self.probe_timeout_seconds == 0 {
            return Err(Error::ConfigValidation(
                "'probe_timeout_seconds' must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Alerting and restart windows in seconds
    pub fn policy(&self) -> Policy {
        Policy {
            alert_cooldown: minutes_to_secs(self.alert_cooldown_minutes),
            suppress: minutes_to_secs(self.suppress_minutes_after_failed_retry),
            restart_backoff: minutes_to_secs(self.retry_backoff_minutes),
        }
    }

    /// Probe timeout as Duration
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    /// Restart grace period as Duration
    pub fn restart_grace(&self) -> Duration {
        Duration::from_secs(self.restart_grace_seconds)
    }
}

/// Windows governing alerts and restarts, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    /// Minimum time between cooldown-gated alerts
    pub alert_cooldown: i64,
    /// Length of the silence after a failed restart
    pub suppress: i64,
    /// Minimum time between restart attempts
    pub restart_backoff: i64,
}

fn minutes_to_secs(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60)).unwrap_or(i64::MAX)
}

fn is_http_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme))
}
