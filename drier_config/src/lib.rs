#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and training-data parsing for the dryer controller.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section is optional; an empty document yields the defaults.
//! - The training CSV loader enforces headers and rejects non-finite values
//!   before anything reaches the model learner.
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Training CSV schema.
///
/// Expected headers:
/// humidity_now,temperature_now,time_remaining,status_kering,moisture_content
///
/// Example:
/// humidity_now,temperature_now,time_remaining,status_kering,moisture_content
/// 72.0,38.5,240,Basah,42.10
/// 35.0,52.0,30,Kering,13.80
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TrainingRow {
    pub humidity_now: f64,
    pub temperature_now: f64,
    pub time_remaining: f64,
    pub status_kering: String,
    pub moisture_content: f64,
}

pub const TRAINING_HEADERS: [&str; 5] = [
    "humidity_now",
    "temperature_now",
    "time_remaining",
    "status_kering",
    "moisture_content",
];

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Server {
    /// Listen address for the HTTP shell
    pub bind: String,
    /// Request bodies above this size are rejected
    pub max_body_bytes: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5000".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Operator targets (JSON)
    pub config_file: PathBuf,
    /// Restart snapshot: temperature, humidity, timestamp (JSON)
    pub snapshot_file: PathBuf,
    /// Append-only CSV of processed readings
    pub log_file: PathBuf,
    pub status_model: PathBuf,
    pub moisture_model: PathBuf,
    /// Labelled samples used when models must be (re)trained
    pub training_csv: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("config.json"),
            snapshot_file: PathBuf::from("last_state.json"),
            log_file: PathBuf::from("logs/data.csv"),
            status_model: PathBuf::from("models/status_model.json"),
            moisture_model: PathBuf::from("models/moisture_model.json"),
            training_csv: PathBuf::from("data/training.csv"),
        }
    }
}

/// Targets used until an operator sets their own.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Targets {
    pub target_moisture: i64,
    pub target_time: i64,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            target_moisture: 16,
            target_time: 4,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Heater runs only below this chamber temperature (°C)
    pub heater_cutoff_c: f64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            heater_cutoff_c: 50.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelCfg {
    /// Maximum depth of each decision tree
    pub max_depth: usize,
    /// Nodes with fewer samples become leaves
    pub min_samples_split: usize,
    /// Training is refused below this many rows
    pub min_training_rows: usize,
}

impl Default for ModelCfg {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_split: 2,
            min_training_rows: 10,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub paths: Paths,
    pub targets: Targets,
    pub control: ControlCfg,
    pub model: ModelCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file; a missing file yields the defaults.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Server
        if self.server.bind.parse::<SocketAddr>().is_err() {
            eyre::bail!(
                "server.bind must be a socket address (host:port), got {:?}",
                self.server.bind
            );
        }
        if self.server.max_body_bytes == 0 {
            eyre::bail!("server.max_body_bytes must be >= 1");
        }

        // Targets
        if !(0..=100).contains(&self.targets.target_moisture) {
            eyre::bail!("targets.target_moisture must be in [0, 100]");
        }
        if self.targets.target_time < 0 {
            eyre::bail!("targets.target_time must be >= 0");
        }

        // Control
        if !self.control.heater_cutoff_c.is_finite() {
            eyre::bail!("control.heater_cutoff_c must be finite");
        }
        if self.control.heater_cutoff_c <= 0.0 || self.control.heater_cutoff_c > 150.0 {
            eyre::bail!("control.heater_cutoff_c must be in (0.0, 150.0]");
        }

        // Model
        if self.model.max_depth == 0 || self.model.max_depth > 64 {
            eyre::bail!("model.max_depth must be in [1, 64]");
        }
        if self.model.min_samples_split < 2 {
            eyre::bail!("model.min_samples_split must be >= 2");
        }
        if self.model.min_training_rows < 2 {
            eyre::bail!("model.min_training_rows must be >= 2");
        }

        // Paths
        let p = &self.paths;
        for (key, path) in [
            ("paths.config_file", &p.config_file),
            ("paths.snapshot_file", &p.snapshot_file),
            ("paths.log_file", &p.log_file),
            ("paths.status_model", &p.status_model),
            ("paths.moisture_model", &p.moisture_model),
            ("paths.training_csv", &p.training_csv),
        ] {
            if path.as_os_str().is_empty() {
                eyre::bail!("{key} must not be empty");
            }
        }
        if p.config_file == p.snapshot_file {
            eyre::bail!("paths.config_file and paths.snapshot_file must differ");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref() {
            if !matches!(rot, "never" | "daily" | "hourly") {
                eyre::bail!("logging.rotation must be one of never|daily|hourly, got {rot:?}");
            }
        }

        Ok(())
    }
}

pub fn load_training_csv(path: &Path) -> eyre::Result<Vec<TrainingRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open training CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != TRAINING_HEADERS {
        eyre::bail!(
            "training CSV must have headers '{}', got: {}",
            TRAINING_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TrainingRow>().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", line, e))?;
        let finite = row.humidity_now.is_finite()
            && row.temperature_now.is_finite()
            && row.time_remaining.is_finite()
            && row.moisture_content.is_finite();
        if !finite {
            eyre::bail!("invalid CSV row {}: numeric fields must be finite", line);
        }
        if row.status_kering.is_empty() {
            eyre::bail!("invalid CSV row {}: status_kering must not be empty", line);
        }
        rows.push(row);
    }

    Ok(rows)
}
