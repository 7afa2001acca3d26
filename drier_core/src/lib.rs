#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Drying-process controller (model- and transport-agnostic).
//!
//! A sensor reading goes through the decision pipeline in `Controller`:
//!
//! - **Validation**: required fields present and finite (`engine::Reading`)
//! - **Inference**: status label and moisture from the `ModelAdapter`
//! - **Policy**: completion, heater and fan (`engine::ControlPolicy`)
//! - **Commit**: restart snapshot and state swap (`state::StateStore`)
//! - **Log**: one CSV row per accepted reading (`event_log`)
//!
//! Operator targets live in `targets::ConfigManager` with their own file and
//! lifecycle. `api` maps all of this onto the HTTP contract.

pub mod api;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod mocks;
pub mod model;
pub mod state;
pub mod targets;
pub mod util;

pub use config::{ModelSettings, Settings};
pub use controller::{Applied, Controller};
pub use engine::{ControlPolicy, Decision, REQUIRED_FIELDS, Reading};
pub use error::{DrierError, Result};
pub use event_log::{CsvEventLogger, EventLogger, LogEntry};
pub use model::{ModelAdapter, Prediction, train_from_csv};
pub use state::{ProcessState, Snapshot, StateStore, Switch};
pub use targets::{ConfigManager, TargetConfig, TargetUpdate};
