//! `From` implementations bridging `drier_config` types to `drier_core` types.

use drier_model::{ModelPaths, TreeParams};

use crate::config::{ModelSettings, Settings};
use crate::engine::ControlPolicy;
use crate::targets::TargetConfig;

// ── TargetConfig ─────────────────────────────────────────────────────────────

impl From<&drier_config::Targets> for TargetConfig {
    fn from(t: &drier_config::Targets) -> Self {
        Self {
            target_moisture: t.target_moisture,
            target_time: t.target_time,
        }
    }
}

// ── ControlPolicy ────────────────────────────────────────────────────────────

impl From<&drier_config::ControlCfg> for ControlPolicy {
    fn from(c: &drier_config::ControlCfg) -> Self {
        Self {
            heater_cutoff_c: c.heater_cutoff_c,
        }
    }
}

// ── ModelSettings ────────────────────────────────────────────────────────────

impl From<&drier_config::Config> for ModelSettings {
    fn from(c: &drier_config::Config) -> Self {
        Self {
            paths: ModelPaths {
                status: c.paths.status_model.clone(),
                moisture: c.paths.moisture_model.clone(),
            },
            training_csv: c.paths.training_csv.clone(),
            params: TreeParams {
                max_depth: c.model.max_depth,
                min_samples_split: c.model.min_samples_split,
            },
            min_training_rows: c.model.min_training_rows,
        }
    }
}

// ── Settings ─────────────────────────────────────────────────────────────────

impl From<&drier_config::Config> for Settings {
    fn from(c: &drier_config::Config) -> Self {
        Self {
            config_file: c.paths.config_file.clone(),
            snapshot_file: c.paths.snapshot_file.clone(),
            log_file: c.paths.log_file.clone(),
            targets: TargetConfig::from(&c.targets),
            policy: ControlPolicy::from(&c.control),
            model: ModelSettings::from(c),
        }
    }
}
