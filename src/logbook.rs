//! Persisted monitor state
//!
//! The logbook is the only memory Lookout has between invocations. It is a
//! small JSON document rewritten atomically (temp file, fsync, rename) at the
//! end of every run, and guarded by an advisory `flock` so two overlapping
//! invocations cannot lose each other's update.

use crate::error::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// State carried across invocations
///
/// Fields are declared in alphabetical order so the serialized keys are
/// sorted and the file diffs cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    /// Unix time of the most recent cooldown-gated alert
    pub last_alert_ts: i64,
    /// Unix time of the most recent restart attempt
    pub last_restart_ts: i64,
    /// Alerts and restarts are skipped while now is before this
    pub suppress_until_ts: i64,
    /// Service was unhealthy as of the previous invocation
    pub was_down: bool,
}

impl MonitorState {
    /// Whether the suppression window is still open at `now`
    pub fn is_suppressed(&self, now: i64) -> bool {
        now < self.suppress_until_ts
    }

    /// Seconds since the last restart attempt
    pub fn since_restart(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_restart_ts)
    }

    /// Seconds since the last cooldown-gated alert
    pub fn since_alert(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_alert_ts)
    }
}

/// Handle to the state file on disk
#[derive(Debug, Clone)]
pub struct Logbook {
    path: PathBuf,
}

impl Logbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted state
    ///
    /// A missing, unreadable or corrupt file yields the default state; the
    /// monitor must keep working even if the file was damaged.
    pub fn load(&self) -> MonitorState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no state file, starting fresh");
                return MonitorState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read state file, using defaults");
                return MonitorState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt state file, using defaults");
                MonitorState::default()
            }
        }
    }

    /// Atomically replace the state file
    pub fn save(&self, state: &MonitorState) -> Result<()> {
        let mut json = serde_json::to_string_pretty(state)?;
        json.push('\n');

        let tmp_path = sibling(&self.path, ".tmp");
        let result = (|| {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            {
                let mut file = File::create(&tmp_path)?;
                file.write_all(json.as_bytes())?;
                file.sync_all()?;
            }
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp_path);
            return Err(Error::StateWrite {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = %self.path.display(), ?state, "state saved");
        Ok(())
    }

    /// Take the exclusive invocation lock without blocking
    ///
    /// The lock lives in `<state>.lock` and is released when the guard drops.
    pub fn lock(&self) -> Result<LogbookLock> {
        let lock_path = sibling(&self.path, ".lock");
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(flock) => Ok(LogbookLock { _flock: flock }),
            Err((_, Errno::EWOULDBLOCK)) => Err(Error::StateLocked(self.path.clone())),
            Err((_, errno)) => Err(Error::Io(io::Error::from(errno))),
        }
    }
}

/// Held for the duration of one read-decide-write cycle
pub struct LogbookLock {
    _flock: Flock<File>,
}

/// `state.json` -> `state.json<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::new(dir.path().join("state.json"));
        assert_eq!(logbook.load(), MonitorState::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::new(dir.path().join("state.json"));
        let state = MonitorState {
            last_alert_ts: 1_700_000_000,
            last_restart_ts: 1_700_000_100,
            suppress_until_ts: 1_700_007_300,
            was_down: true,
        };

        logbook.save(&state).unwrap();
        assert_eq!(logbook.load(), state);
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_saved_keys_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::new(dir.path().join("state.json"));
        logbook.save(&MonitorState::default()).unwrap();

        let content = fs::read_to_string(logbook.path()).unwrap();
        let keys: Vec<&str> = content
            .lines()
            .filter_map(|line| line.trim().strip_prefix('"'))
            .filter_map(|rest| rest.split('"').next())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, r#"{"was_down": true, "last_alert_ts": 42}"#).unwrap();

        let state = Logbook::new(&path).load();
        assert!(state.was_down);
        assert_eq!(state.last_alert_ts, 42);
        assert_eq!(state.suppress_until_ts, 0);
        assert_eq!(state.last_restart_ts, 0);
    }

    #[test]
    fn test_corrupt_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{\"was_down\": tr").unwrap();

        assert_eq!(Logbook::new(&path).load(), MonitorState::default());
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::new(dir.path().join("var").join("state.json"));
        logbook.save(&MonitorState::default()).unwrap();
        assert!(logbook.path().exists());
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail
        let path = dir.path().join("state.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupant"), "x").unwrap();

        let err = Logbook::new(&path).save(&MonitorState::default()).unwrap_err();
        assert!(matches!(err, Error::StateWrite { .. }));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let logbook = Logbook::new(dir.path().join("state.json"));

        let guard = logbook.lock().unwrap();
        assert!(matches!(logbook.lock(), Err(Error::StateLocked(_))));

        drop(guard);
        assert!(logbook.lock().is_ok());
    }

    #[test]
    fn test_window_helpers() {
        let state = MonitorState {
            last_alert_ts: 100,
            last_restart_ts: 50,
            suppress_until_ts: 200,
            was_down: true,
        };
        assert!(state.is_suppressed(199));
        assert!(!state.is_suppressed(200));
        assert_eq!(state.since_alert(160), 60);
        assert_eq!(state.since_restart(160), 110);
    }
}
