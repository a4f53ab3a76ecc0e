//! Alert message texts

use crate::manifest::LookoutConfig;
use crate::watch::decision::Notice;
use chrono::{DateTime, Utc};

/// Renders notices for one service
#[derive(Debug, Clone)]
pub struct Herald {
    service: String,
    host: Option<String>,
}

impl Herald {
    pub fn new(service: &str, host: Option<&str>) -> Self {
        Self {
            service: service.to_string(),
            host: host.filter(|h| !h.trim().is_empty()).map(str::to_string),
        }
    }

    pub fn from_config(config: &LookoutConfig) -> Self {
        Self::new(&config.plex.display_name, config.host_label.as_deref())
    }

    /// `[2026-10-19T12:00:00Z] ALERT: Plex appears DOWN on mini.`
    pub fn render(&self, notice: Notice, at: i64) -> String {
        let body = match notice {
            Notice::Recovered => format!("OK: {} is back UP.", self.service),
            Notice::RestartSucceeded => {
                format!("INFO: {} was down but auto-restart succeeded.", self.service)
            }
            Notice::RestartFailed => format!(
                "ALERT: {} is DOWN. Auto-restart attempted and FAILED.",
                self.service
            ),
            Notice::Down => match &self.host {
                Some(host) => format!("ALERT: {} appears DOWN on {}.", self.service, host),
                None => format!("ALERT: {} appears DOWN.", self.service),
            },
        };
        format!("[{}] {}", iso_utc(at), body)
    }
}

/// Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`
pub fn iso_utc(ts: i64) -> String {
    match DateTime::<Utc>::from_timestamp(ts, 0) {
        Some(t) => t.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => ts.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2025-10-09T08:53:20Z
    const AT: i64 = 1_760_000_000;

    #[test]
    fn test_iso_utc() {
        assert_eq!(iso_utc(0), "1970-01-01T00:00:00Z");
        assert_eq!(iso_utc(AT), "2025-10-09T08:53:20Z");
    }

    #[test]
    fn test_messages() {
        let herald = Herald::new("Plex", Some("Mac mini"));
        assert_eq!(
            herald.render(Notice::Recovered, AT),
            "[2025-10-09T08:53:20Z] OK: Plex is back UP."
        );
        assert_eq!(
            herald.render(Notice::RestartSucceeded, AT),
            "[2025-10-09T08:53:20Z] INFO: Plex was down but auto-restart succeeded."
        );
        assert_eq!(
            herald.render(Notice::RestartFailed, AT),
            "[2025-10-09T08:53:20Z] ALERT: Plex is DOWN. Auto-restart attempted and FAILED."
        );
        assert_eq!(
            herald.render(Notice::Down, AT),
            "[2025-10-09T08:53:20Z] ALERT: Plex appears DOWN on Mac mini."
        );
    }

    #[test]
    fn test_down_without_host() {
        let herald = Herald::new("Jellyfin", Some("  "));
        assert!(herald.render(Notice::Down, AT).ends_with("ALERT: Jellyfin appears DOWN."));
    }
}
