//! Health probing and recovery for the monitored service
//!
//! Provides:
//! - Process and HTTP health probe
//! - Best-effort restart action

pub mod probe;
pub mod recovery;

pub use probe::{HealthProbe, ServiceProbe};
pub use recovery::{CommandRestart, NoRestart, RestartAction};
