//! Alert, restart and suppression rules
//!
//! Pure functions over `MonitorState`. No I/O happens here: the engine feeds
//! in probe results and the current time, then carries out what comes back.
//!
//! | verdict              | condition                                  |
//! |----------------------|--------------------------------------------|
//! | Healthy              | probe passed                               |
//! | DownSuppressed       | probe failed, now < suppress_until_ts      |
//! | DownRestartEligible  | probe failed, restart backoff has elapsed  |
//! | DownBackoff          | probe failed, still inside restart backoff |

use crate::logbook::MonitorState;
use crate::manifest::Policy;

/// Classification of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    DownSuppressed,
    DownRestartEligible,
    DownBackoff,
}

impl Verdict {
    /// Classify a probe result against the persisted windows
    pub fn classify(policy: &Policy, state: &MonitorState, healthy: bool, now: i64) -> Self {
        if healthy {
            Verdict::Healthy
        } else if state.is_suppressed(now) {
            Verdict::DownSuppressed
        } else if state.since_restart(now) >= policy.restart_backoff {
            Verdict::DownRestartEligible
        } else {
            Verdict::DownBackoff
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Healthy => write!(f, "healthy"),
            Verdict::DownSuppressed => write!(f, "down (suppressed)"),
            Verdict::DownRestartEligible => write!(f, "down (restart eligible)"),
            Verdict::DownBackoff => write!(f, "down (restart backoff)"),
        }
    }
}

/// Message the engine should send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// Service came back on its own
    Recovered,
    /// Auto-restart brought the service back
    RestartSucceeded,
    /// Auto-restart was tried and the service is still down
    RestartFailed,
    /// Ordinary down alert, subject to the alert cooldown
    Down,
}

impl Notice {
    /// Only cooldown-gated alerts move `last_alert_ts`
    pub fn is_gated(self) -> bool {
        matches!(self, Notice::Down)
    }
}

/// Process-level result of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Healthy or recovered
    Up,
    /// Still down, whatever the reason
    Down,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Up => 0,
            ExitStatus::Down => 1,
        }
    }
}

/// Everything decided for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub verdict: Verdict,
    /// State to persist
    pub state: MonitorState,
    pub notice: Option<Notice>,
    pub exit: ExitStatus,
}

/// First half of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Nothing left to observe
    Done(Outcome),
    /// Launch a restart, wait out the grace period, then call
    /// [`conclude_restart`] with this state and a fresh probe result
    Restart(MonitorState),
}

/// Decide what to do with the first probe result
pub fn assess(policy: &Policy, prior: &MonitorState, healthy: bool, now: i64) -> Step {
    let verdict = Verdict::classify(policy, prior, healthy, now);

    if verdict == Verdict::Healthy {
        return Step::Done(Outcome {
            verdict,
            state: MonitorState {
                was_down: false,
                suppress_until_ts: 0,
                ..*prior
            },
            notice: prior.was_down.then_some(Notice::Recovered),
            exit: ExitStatus::Up,
        });
    }

    let fresh_failure = !prior.was_down;
    let mut state = MonitorState {
        was_down: true,
        ..*prior
    };

    match verdict {
        Verdict::DownRestartEligible => {
            // Counts as an attempt whatever happens next
            state.last_restart_ts = now;
            Step::Restart(state)
        }
        Verdict::DownBackoff => {
            let cooled = state.since_alert(now) >= policy.alert_cooldown;
            Step::Done(Outcome {
                verdict,
                state,
                notice: (fresh_failure || cooled).then_some(Notice::Down),
                exit: ExitStatus::Down,
            })
        }
        _ => Step::Done(Outcome {
            verdict,
            state,
            notice: None,
            exit: ExitStatus::Down,
        }),
    }
}

/// Decide what to do once the post-restart probe is in
///
/// A failed restart is always reported but does not refresh `last_alert_ts`,
/// so the first gated alert after the suppression window measures its
/// cooldown from the last ordinary alert.
pub fn conclude_restart(
    policy: &Policy,
    state: &MonitorState,
    healthy_after: bool,
    now: i64,
) -> Outcome {
    let mut state = *state;

    if healthy_after {
        state.was_down = false;
        return Outcome {
            verdict: Verdict::DownRestartEligible,
            state,
            notice: Some(Notice::RestartSucceeded),
            exit: ExitStatus::Up,
        };
    }

    state.suppress_until_ts = state
        .suppress_until_ts
        .max(now.saturating_add(policy.suppress));

    Outcome {
        verdict: Verdict::DownRestartEligible,
        state,
        notice: Some(Notice::RestartFailed),
        exit: ExitStatus::Down,
    }
}

/// Bookkeeping after a notice was actually delivered
pub fn record_delivery(state: &mut MonitorState, notice: Notice, now: i64) {
    if notice.is_gated() {
        state.last_alert_ts = now;
    }
}
