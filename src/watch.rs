//! Monitoring cycle for the watched service
//!
//! Provides:
//! - Pure alert/restart/suppression rules
//! - Alert message rendering
//! - The engine that runs one cycle against the logbook
//! - A read-only status view

pub mod decision;
pub mod engine;
pub mod notice;
pub mod status;

pub use engine::MonitorEngine;
pub use notice::Herald;
pub use status::StatusReport;
