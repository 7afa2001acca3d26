//! Reading validation and the actuator/completion policy.
//!
//! Everything here is pure: the controller supplies the clock, the targets
//! and the model output.

use chrono::{DateTime, Utc};
use drier_traits::Features;
use serde_json::Value;

use crate::error::{DrierError, Result};
use crate::model::Prediction;
use crate::state::{DEFAULT_CLOCK_TEXT, ProcessState, Switch};
use crate::targets::TargetConfig;

/// Fields every reading must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 3] = ["temperature_now", "humidity_now", "time_remaining"];

/// A validated sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub temperature_now: f64,
    pub humidity_now: f64,
    /// Negative once the batch is overdue.
    pub time_remaining: f64,
    pub rtc: String,
    pub elapsed_time: String,
}

/// JSON number or numeric string, finite only.
pub fn coerce_f64(v: &Value) -> Option<f64> {
    let x = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

/// Device clock text: absent or null becomes `00:00:00`, strings verbatim,
/// anything else as its JSON text.
pub fn passthrough(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => DEFAULT_CLOCK_TEXT.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl Reading {
    /// Validate a request body.
    ///
    /// All three required fields are checked before returning, so the error
    /// names every field that needs fixing.
    pub fn from_json(body: &Value) -> Result<Self> {
        let obj = body.as_object();
        let mut missing = Vec::new();
        let mut invalid = Vec::new();
        let mut values = [0.0; REQUIRED_FIELDS.len()];
        for (slot, name) in values.iter_mut().zip(REQUIRED_FIELDS) {
            match obj.and_then(|o| o.get(name)) {
                None | Some(Value::Null) => missing.push(name),
                Some(v) => match coerce_f64(v) {
                    Some(x) => *slot = x,
                    None => invalid.push(name),
                },
            }
        }
        if !missing.is_empty() || !invalid.is_empty() {
            return Err(DrierError::InvalidInput { missing, invalid });
        }
        let [temperature_now, humidity_now, time_remaining] = values;
        Ok(Self {
            temperature_now,
            humidity_now,
            time_remaining,
            rtc: passthrough(obj.and_then(|o| o.get("rtc"))),
            elapsed_time: passthrough(obj.and_then(|o| o.get("elapsed_time"))),
        })
    }

    pub fn features(&self) -> Features {
        Features::new(self.humidity_now, self.temperature_now, self.time_remaining)
    }
}

/// Actuator commands and completion for one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub process_finish: bool,
    pub heater: Switch,
    pub fan: Switch,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPolicy {
    /// Heater stays off at or above this chamber temperature (°C).
    pub heater_cutoff_c: f64,
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self {
            heater_cutoff_c: 50.0,
        }
    }
}

impl ControlPolicy {
    pub fn decide(
        &self,
        moisture_content: f64,
        target_moisture: i64,
        time_remaining: f64,
        temperature: f64,
    ) -> Decision {
        let process_finish = moisture_content <= target_moisture as f64 || time_remaining <= 0.0;
        Decision {
            process_finish,
            heater: Switch::from_bool(!process_finish && temperature < self.heater_cutoff_c),
            fan: Switch::from_bool(!process_finish),
        }
    }

    /// Next process state. Every field is derived from this reading, so the
    /// previous state does not enter the computation.
    pub fn next_state(
        &self,
        reading: &Reading,
        prediction: Prediction,
        targets: TargetConfig,
        at: DateTime<Utc>,
    ) -> ProcessState {
        let d = self.decide(
            prediction.moisture_content,
            targets.target_moisture,
            reading.time_remaining,
            reading.temperature_now,
        );
        ProcessState {
            temperature_now: reading.temperature_now,
            humidity_now: reading.humidity_now,
            rtc: reading.rtc.clone(),
            elapsed_time: reading.elapsed_time.clone(),
            heater_status: d.heater,
            fan_status: d.fan,
            clove_status: prediction.status,
            moisture_content: prediction.moisture_content,
            target_moisture: targets.target_moisture,
            target_time: targets.target_time,
            process_finish: d.process_finish,
            last_update: at,
        }
    }
}
