//! Runtime settings for the controller.
//!
//! Built from `drier_config::Config` (see `conversions`), kept separate so
//! tests can construct them without TOML.

use std::path::PathBuf;

use drier_model::{ModelPaths, TreeParams};

use crate::engine::ControlPolicy;
use crate::targets::TargetConfig;

/// Model files, training source and learner limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub paths: ModelPaths,
    pub training_csv: PathBuf,
    pub params: TreeParams,
    /// Retraining with fewer rows than this is refused.
    pub min_training_rows: usize,
}

impl ModelSettings {
    /// Settings rooted at `dir`, with the default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            paths: ModelPaths {
                status: dir.join("models/status_model.json"),
                moisture: dir.join("models/moisture_model.json"),
            },
            training_csv: dir.join("data/training.csv"),
            params: TreeParams::default(),
            min_training_rows: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub config_file: PathBuf,
    pub snapshot_file: PathBuf,
    pub log_file: PathBuf,
    pub targets: TargetConfig,
    pub policy: ControlPolicy,
    pub model: ModelSettings,
}

impl Settings {
    /// Settings with every file under `dir`; handy for tests and tooling.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            config_file: dir.join("config.json"),
            snapshot_file: dir.join("last_state.json"),
            log_file: dir.join("logs/data.csv"),
            targets: TargetConfig::default(),
            policy: ControlPolicy::default(),
            model: ModelSettings::in_dir(dir),
        }
    }
}
