//! Test and helper mocks for drier_core

use std::sync::{Arc, Mutex};

use drier_traits::{BoxError, Features, MoistureRegressor, StatusClassifier};

use crate::error::{DrierError, Result};
use crate::event_log::{EventLogger, LogEntry};
use crate::model::ModelAdapter;
use crate::util::lock;

#[derive(Debug)]
struct StubInner {
    status: String,
    moisture: f64,
    seen: Vec<Features>,
}

/// Model pair with fixed, adjustable outputs. Clones share state, so a
/// test can keep a handle after giving an adapter to the controller.
#[derive(Debug, Clone)]
pub struct StubModel {
    inner: Arc<Mutex<StubInner>>,
}

impl StubModel {
    pub fn new(status: &str, moisture: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StubInner {
                status: status.to_string(),
                moisture,
                seen: Vec::new(),
            })),
        }
    }

    pub fn adapter(&self) -> ModelAdapter {
        ModelAdapter::new(self.clone(), self.clone())
    }

    pub fn set_moisture(&self, moisture: f64) {
        lock(&self.inner).moisture = moisture;
    }

    /// Features passed to the classifier so far.
    pub fn seen(&self) -> Vec<Features> {
        lock(&self.inner).seen.clone()
    }

    pub fn last_features(&self) -> Option<Features> {
        lock(&self.inner).seen.last().copied()
    }
}

impl StatusClassifier for StubModel {
    fn classify(&self, features: &Features) -> std::result::Result<String, BoxError> {
        let mut g = lock(&self.inner);
        g.seen.push(*features);
        Ok(g.status.clone())
    }
}

impl MoistureRegressor for StubModel {
    fn estimate(&self, _features: &Features) -> std::result::Result<f64, BoxError> {
        Ok(lock(&self.inner).moisture)
    }
}

/// A model that always errors.
#[derive(Debug, Clone, Copy)]
pub struct FailingModel;

impl StatusClassifier for FailingModel {
    fn classify(&self, _features: &Features) -> std::result::Result<String, BoxError> {
        Err(Box::new(std::io::Error::other("classifier offline")))
    }
}

impl MoistureRegressor for FailingModel {
    fn estimate(&self, _features: &Features) -> std::result::Result<f64, BoxError> {
        Err(Box::new(std::io::Error::other("regressor offline")))
    }
}

/// In-memory event log; clones share the entries.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        lock(&self.entries).clone()
    }
}

impl EventLogger for RecordingLog {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        lock(&self.entries).push(entry.clone());
        Ok(())
    }
}

/// Event log whose appends always fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingLog;

impl EventLogger for FailingLog {
    fn append(&self, _entry: &LogEntry) -> Result<()> {
        Err(DrierError::EventLog("disk full".to_string()))
    }
}
