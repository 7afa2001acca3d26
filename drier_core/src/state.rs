//! Process state and the store that owns it.
//!
//! The store keeps one `ProcessState` for the machine and a restart
//! snapshot (temperature, humidity, timestamp) on disk. A commit writes the
//! snapshot and swaps the in-memory value while holding the persist mutex,
//! so the file and memory always change in the same order; readers only
//! take the `RwLock` for the swap itself.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DrierError, Result};
use crate::targets::TargetConfig;
use crate::util::{lock, read, write, write_atomic};

/// Actuator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    #[inline]
    pub fn from_bool(on: bool) -> Self {
        if on { Switch::On } else { Switch::Off }
    }

    #[inline]
    pub fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

pub const DEFAULT_CLOCK_TEXT: &str = "00:00:00";
pub const DEFAULT_CLOVE_STATUS: &str = "Basah";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessState {
    pub temperature_now: f64,
    pub humidity_now: f64,
    pub rtc: String,
    pub elapsed_time: String,
    pub heater_status: Switch,
    pub fan_status: Switch,
    pub clove_status: String,
    pub moisture_content: f64,
    pub target_moisture: i64,
    pub target_time: i64,
    pub process_finish: bool,
    pub last_update: DateTime<Utc>,
}

impl ProcessState {
    /// State of a machine that has not reported yet.
    pub fn initial(at: DateTime<Utc>, targets: TargetConfig) -> Self {
        Self {
            temperature_now: 25.0,
            humidity_now: 60.0,
            rtc: DEFAULT_CLOCK_TEXT.to_string(),
            elapsed_time: DEFAULT_CLOCK_TEXT.to_string(),
            heater_status: Switch::Off,
            fan_status: Switch::Off,
            clove_status: DEFAULT_CLOVE_STATUS.to_string(),
            moisture_content: 0.0,
            target_moisture: targets.target_moisture,
            target_time: targets.target_time,
            process_finish: false,
            last_update: at,
        }
    }

    pub fn with_targets(mut self, targets: TargetConfig) -> Self {
        self.target_moisture = targets.target_moisture;
        self.target_time = targets.target_time;
        self
    }
}

/// Minimal subset of the state that survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub timestamp: String,
}

impl Snapshot {
    pub fn of(state: &ProcessState, at: DateTime<Utc>) -> Self {
        Self {
            temperature: state.temperature_now,
            humidity: state.humidity_now,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }

    /// RFC 3339, or a naive ISO-8601 timestamp read as UTC.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(t) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(t.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|n| n.and_utc())
    }
}

pub struct StateStore {
    current: RwLock<ProcessState>,
    snapshot_path: Option<PathBuf>,
    persist: Mutex<()>,
}

impl core::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StateStore")
            .field("snapshot_path", &self.snapshot_path)
            .finish()
    }
}

impl StateStore {
    /// Store backed by a snapshot file; restores it immediately.
    pub fn open(snapshot_path: impl Into<PathBuf>, initial: ProcessState) -> Self {
        let store = Self {
            current: RwLock::new(initial),
            snapshot_path: Some(snapshot_path.into()),
            persist: Mutex::new(()),
        };
        store.restore_from_disk();
        store
    }

    /// In-memory store; commits never touch the disk.
    pub fn ephemeral(initial: ProcessState) -> Self {
        Self {
            current: RwLock::new(initial),
            snapshot_path: None,
            persist: Mutex::new(()),
        }
    }

    pub fn get(&self) -> ProcessState {
        read(&self.current).clone()
    }

    /// Persist the restart snapshot for `next`, then make it current.
    ///
    /// On error nothing changes: the previous state stays visible.
    pub fn commit(&self, next: ProcessState) -> Result<()> {
        let _persist = lock(&self.persist);
        if let Some(path) = &self.snapshot_path {
            write_snapshot(path, &Snapshot::of(&next, next.last_update))?;
        }
        *write(&self.current) = next;
        Ok(())
    }

    /// Merge the on-disk snapshot into the current state.
    ///
    /// A missing file is normal on first start. Unreadable or malformed
    /// content is logged and ignored.
    pub fn restore_from_disk(&self) -> Option<Snapshot> {
        let path = self.snapshot_path.as_deref()?;
        let _persist = lock(&self.persist);
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no restart snapshot, using defaults");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read restart snapshot");
                return None;
            }
        };
        let snap: Snapshot = match serde_json::from_slice(&bytes) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring malformed restart snapshot");
                return None;
            }
        };
        if !(snap.temperature.is_finite() && snap.humidity.is_finite()) {
            tracing::warn!(path = %path.display(), "ignoring restart snapshot with non-finite values");
            return None;
        }

        let mut cur = write(&self.current);
        cur.temperature_now = snap.temperature;
        cur.humidity_now = snap.humidity;
        match snap.parsed_timestamp() {
            Some(t) => cur.last_update = t,
            None => {
                tracing::warn!(timestamp = %snap.timestamp, "restart snapshot timestamp not understood")
            }
        }
        tracing::info!(
            temperature = snap.temperature,
            humidity = snap.humidity,
            timestamp = %snap.timestamp,
            "restored restart snapshot"
        );
        Some(snap)
    }

    /// Best-effort snapshot write on graceful termination.
    pub fn persist_on_shutdown(&self, at: DateTime<Utc>) -> bool {
        let Some(path) = self.snapshot_path.as_deref() else {
            return true;
        };
        let _persist = lock(&self.persist);
        let snap = Snapshot::of(&read(&self.current), at);
        match write_snapshot(path, &snap) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "restart snapshot written");
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "restart snapshot not written");
                false
            }
        }
    }
}

fn write_snapshot(path: &Path, snap: &Snapshot) -> Result<()> {
    let bytes = serde_json::to_vec(snap)
        .map_err(|e| DrierError::Persist(format!("encode snapshot: {e}")))?;
    write_atomic(path, &bytes)
        .map_err(|e| DrierError::Persist(format!("write {}: {e}", path.display())))
}
