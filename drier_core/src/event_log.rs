//! Append-only CSV audit log, one row per processed reading.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::Serialize;

use crate::error::{DrierError, Result};
use crate::state::{ProcessState, Switch};
use crate::util::lock;

pub const LOG_HEADERS: [&str; 9] = [
    "timestamp",
    "temperature",
    "humidity",
    "moisture_pred",
    "status",
    "heater",
    "fan",
    "target_moisture",
    "target_time",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub temperature: f64,
    pub humidity: f64,
    pub moisture_pred: f64,
    pub status: String,
    pub heater: Switch,
    pub fan: Switch,
    pub target_moisture: i64,
    pub target_time: i64,
}

impl LogEntry {
    pub fn from_state(state: &ProcessState) -> Self {
        Self {
            timestamp: state
                .last_update
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            temperature: state.temperature_now,
            humidity: state.humidity_now,
            moisture_pred: state.moisture_content,
            status: state.clove_status.clone(),
            heater: state.heater_status,
            fan: state.fan_status,
            target_moisture: state.target_moisture,
            target_time: state.target_time,
        }
    }
}

/// Sink for log entries. Implementations serialize appends themselves.
pub trait EventLogger {
    fn append(&self, entry: &LogEntry) -> Result<()>;
}

#[derive(Debug)]
pub struct CsvEventLogger {
    path: PathBuf,
    guard: Mutex<()>,
}

impl CsvEventLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn append_row(&self, entry: &LogEntry) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if fresh {
            wtr.write_record(LOG_HEADERS)?;
        }
        wtr.serialize(entry).map_err(std::io::Error::other)?;
        wtr.flush()?;
        wtr.get_ref().sync_data()
    }
}

impl EventLogger for CsvEventLogger {
    fn append(&self, entry: &LogEntry) -> Result<()> {
        let _g = lock(&self.guard);
        self.append_row(entry)
            .map_err(|e| DrierError::EventLog(format!("{}: {e}", self.path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(status: &str) -> LogEntry {
        LogEntry {
            timestamp: "2026-10-14T08:00:00.000000Z".into(),
            temperature: 45.0,
            humidity: 30.0,
            moisture_pred: 20.5,
            status: status.into(),
            heater: Switch::On,
            fan: Switch::On,
            target_moisture: 16,
            target_time: 4,
        }
    }

    #[test]
    fn header_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/data.csv");
        let log = CsvEventLogger::new(&path);
        log.append(&entry("Basah")).unwrap();
        log.append(&entry("Kering")).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], LOG_HEADERS.join(","));
        assert_eq!(
            lines[1],
            "2026-10-14T08:00:00.000000Z,45.0,30.0,20.5,Basah,ON,ON,16,4"
        );
        assert!(lines[2].contains(",Kering,"));
    }

    #[test]
    fn existing_file_gets_no_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        CsvEventLogger::new(&path).append(&entry("Basah")).unwrap();
        CsvEventLogger::new(&path).append(&entry("Basah")).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("timestamp,").count(), 1);
    }

    #[test]
    fn unwritable_path_reports_event_log_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvEventLogger::new(dir.path());
        let err = log.append(&entry("Basah")).unwrap_err();
        assert!(matches!(err, DrierError::EventLog(_)));
    }
}
