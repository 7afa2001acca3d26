//! Operator targets (target moisture and target time).
//!
//! Owned separately from the process state: the decision engine reads them,
//! only `ConfigManager::set` writes them. Every successful `set` is written
//! to disk before it becomes visible.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DrierError, Result};
use crate::util::{lock, read, write, write_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub target_moisture: i64,
    pub target_time: i64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            target_moisture: 16,
            target_time: 4,
        }
    }
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetUpdate {
    pub target_moisture: Option<i64>,
    pub target_time: Option<i64>,
}

/// Integer coercion for target values.
///
/// Accepts JSON integers, finite floats (truncated toward zero) and strings
/// holding an integer. Booleans, null and everything else are rejected.
pub fn coerce_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Some(i);
            }
            let f = n.as_f64()?;
            let t = f.trunc();
            if t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64 {
                Some(t as i64)
            } else {
                None
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

impl TargetUpdate {
    /// Parse a request body; both fields are checked before anything applies.
    pub fn from_json(body: &Value) -> Result<Self> {
        let Some(obj) = body.as_object() else {
            return Err(DrierError::InvalidConfig(
                "request body must be a JSON object".to_string(),
            ));
        };
        let field = |name: &str| -> Result<Option<i64>> {
            match obj.get(name) {
                None => Ok(None),
                Some(v) => coerce_i64(v).map(Some).ok_or_else(|| {
                    DrierError::InvalidConfig(format!("{name} must be an integer, got {v}"))
                }),
            }
        };
        Ok(Self {
            target_moisture: field("target_moisture")?,
            target_time: field("target_time")?,
        })
    }

    pub fn apply(&self, to: TargetConfig) -> TargetConfig {
        TargetConfig {
            target_moisture: self.target_moisture.unwrap_or(to.target_moisture),
            target_time: self.target_time.unwrap_or(to.target_time),
        }
    }
}

pub struct ConfigManager {
    current: RwLock<TargetConfig>,
    path: Option<PathBuf>,
    persist: Mutex<()>,
}

impl core::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("current", &self.get())
            .field("path", &self.path)
            .finish()
    }
}

impl ConfigManager {
    /// Manager backed by a JSON file; a missing or corrupt file means `defaults`.
    pub fn open(path: impl Into<PathBuf>, defaults: TargetConfig) -> Self {
        let path = path.into();
        let current = load_targets(&path, defaults);
        Self {
            current: RwLock::new(current),
            path: Some(path),
            persist: Mutex::new(()),
        }
    }

    pub fn ephemeral(defaults: TargetConfig) -> Self {
        Self {
            current: RwLock::new(defaults),
            path: None,
            persist: Mutex::new(()),
        }
    }

    pub fn get(&self) -> TargetConfig {
        *read(&self.current)
    }

    /// Apply a partial update and persist it.
    ///
    /// If the write fails the previous targets stay in effect.
    pub fn set(&self, update: TargetUpdate) -> Result<TargetConfig> {
        let _persist = lock(&self.persist);
        let next = update.apply(self.get());
        if let Some(path) = &self.path {
            let bytes = serde_json::to_vec(&next)
                .map_err(|e| DrierError::Persist(format!("encode targets: {e}")))?;
            write_atomic(path, &bytes)
                .map_err(|e| DrierError::Persist(format!("write {}: {e}", path.display())))?;
        }
        *write(&self.current) = next;
        tracing::info!(
            target_moisture = next.target_moisture,
            target_time = next.target_time,
            "targets updated"
        );
        Ok(next)
    }
}

fn load_targets(path: &Path, defaults: TargetConfig) -> TargetConfig {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no targets file, using defaults");
            return defaults;
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read targets file, using defaults");
            return defaults;
        }
    };
    let value: Value = match serde_json::from_slice(&bytes) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "malformed targets file, using defaults");
            return defaults;
        }
    };
    let Some(obj) = value.as_object() else {
        tracing::warn!(path = %path.display(), "targets file is not an object, using defaults");
        return defaults;
    };
    let pick = |name: &str, fallback: i64| match obj.get(name) {
        None => fallback,
        Some(v) => coerce_i64(v).unwrap_or_else(|| {
            tracing::warn!(field = name, value = %v, "ignoring invalid target in file");
            fallback
        }),
    };
    let loaded = TargetConfig {
        target_moisture: pick("target_moisture", defaults.target_moisture),
        target_time: pick("target_time", defaults.target_time),
    };
    tracing::info!(
        path = %path.display(),
        target_moisture = loaded.target_moisture,
        target_time = loaded.target_time,
        "loaded targets"
    );
    loaded
}
