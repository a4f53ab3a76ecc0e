//! One monitoring cycle
//!
//! Reads the logbook, probes the service, applies the decision rules,
//! performs the resulting restart and notification, and writes the logbook
//! back exactly once.

use crate::error::Result;
use crate::logbook::{Logbook, MonitorState};
use crate::manifest::Policy;
use crate::radio::Notifier;
use crate::sickbay::{HealthProbe, RestartAction};
use crate::watch::decision::{self, Notice, Outcome, Step};
use crate::watch::notice::Herald;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Drives the decision rules against real (or fake) collaborators
pub struct MonitorEngine<'a> {
    policy: Policy,
    probe: &'a dyn HealthProbe,
    notifier: &'a dyn Notifier,
    restarter: &'a dyn RestartAction,
    herald: Herald,
    grace: Duration,
}

impl<'a> MonitorEngine<'a> {
    pub fn new(
        policy: Policy,
        probe: &'a dyn HealthProbe,
        notifier: &'a dyn Notifier,
        restarter: &'a dyn RestartAction,
        herald: Herald,
    ) -> Self {
        Self {
            policy,
            probe,
            notifier,
            restarter,
            herald,
            grace: Duration::from_secs(8),
        }
    }

    /// Wait between launching a restart and re-probing
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Full cycle under the logbook lock
    ///
    /// The only error paths are lock contention (before anything happens)
    /// and a failed state write.
    pub fn run(&self, logbook: &Logbook, now: i64) -> Result<Outcome> {
        let _lock = logbook.lock()?;
        let prior = logbook.load();
        let outcome = self.evaluate(&prior, now);
        logbook.save(&outcome.state)?;
        Ok(outcome)
    }

    /// Decide and act without touching the logbook
    ///
    /// Restart and notification failures are logged and absorbed; the
    /// returned state is always safe to persist.
    pub fn evaluate(&self, prior: &MonitorState, now: i64) -> Outcome {
        let started = Instant::now();
        let healthy = self.probe.check();

        let mut outcome = match decision::assess(&self.policy, prior, healthy, now) {
            Step::Done(outcome) => outcome,
            Step::Restart(state) => {
                info!("service down, attempting auto-restart");
                if let Err(e) = self.restarter.attempt_restart() {
                    warn!(error = %e, "restart launch failed");
                }
                if !self.grace.is_zero() {
                    thread::sleep(self.grace);
                }
                let healthy_after = self.probe.check();
                decision::conclude_restart(&self.policy, &state, healthy_after, now)
            }
        };

        // Messages carry the send time; state keeps the cycle's `now`
        let sent_at = now.saturating_add(started.elapsed().as_secs() as i64);
        let delivered = match outcome.notice {
            Some(notice) => self.deliver(notice, &mut outcome.state, now, sent_at),
            None => false,
        };

        info!(
            verdict = %outcome.verdict,
            notice = ?outcome.notice,
            delivered,
            exit = outcome.exit.code(),
            "cycle complete"
        );
        outcome
    }

    /// Send the notice; returns whether the notifier accepted it
    fn deliver(&self, notice: Notice, state: &mut MonitorState, now: i64, sent_at: i64) -> bool {
        let message = self.herald.render(notice, sent_at);
        match self.notifier.send(&message) {
            Ok(()) => {
                decision::record_delivery(state, notice, now);
                true
            }
            Err(e) => {
                error!(?notice, error = %e, "notification failed, continuing");
                false
            }
        }
    }
}
