//! Read-only view of the logbook for `lookout status`

use crate::logbook::MonitorState;
use crate::manifest::Policy;
use crate::watch::notice::iso_utc;
use serde::Serialize;
use std::fmt;

/// Persisted state plus the windows it implies at a given instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub state: MonitorState,
    /// Seconds of suppression left, if a window is open
    pub suppressed_for_secs: Option<i64>,
    /// Seconds until another restart may be attempted, if in backoff
    pub restart_backoff_secs: Option<i64>,
    /// Seconds until an ordinary alert may repeat, if cooling down
    pub alert_cooldown_secs: Option<i64>,
}

impl StatusReport {
    pub fn new(policy: &Policy, state: MonitorState, now: i64) -> Self {
        let remaining = |left: i64| (left > 0).then_some(left);
        Self {
            suppressed_for_secs: remaining(state.suppress_until_ts.saturating_sub(now)),
            restart_backoff_secs: remaining(policy.restart_backoff.saturating_sub(state.since_restart(now))),
            alert_cooldown_secs: remaining(policy.alert_cooldown.saturating_sub(state.since_alert(now))),
            state,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = |ts: i64| if ts == 0 { "never".to_string() } else { iso_utc(ts) };
        let window = |secs: Option<i64>| match secs {
            Some(s) => format!("{}m{:02}s left", s / 60, s % 60),
            None => "clear".to_string(),
        };

        writeln!(
            f,
            "Service:        {}",
            if self.state.was_down { "DOWN" } else { "up" }
        )?;
        writeln!(f, "Last alert:     {}", stamp(self.state.last_alert_ts))?;
        writeln!(f, "Last restart:   {}", stamp(self.state.last_restart_ts))?;
        writeln!(f, "Suppression:    {}", window(self.suppressed_for_secs))?;
        writeln!(f, "Restart window: {}", window(self.restart_backoff_secs))?;
        write!(f, "Alert cooldown: {}", window(self.alert_cooldown_secs))
    }
}
