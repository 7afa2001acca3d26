//! The process-wide controller handle.
//!
//! Owns the state store, the target manager, the event log and the current
//! model pair. Request handlers share it by reference; every lock is
//! internal.

use std::sync::{Arc, RwLock};

use drier_traits::{Clock, SystemClock};
use serde_json::Value;

use crate::config::{ModelSettings, Settings};
use crate::engine::{ControlPolicy, Reading};
use crate::error::{DrierError, Result};
use crate::event_log::{CsvEventLogger, EventLogger, LogEntry};
use crate::model::{ModelAdapter, train_from_csv};
use crate::state::{ProcessState, StateStore};
use crate::targets::{ConfigManager, TargetConfig, TargetUpdate};
use crate::util::{read, write};

/// Outcome of an accepted reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub state: ProcessState,
    pub entry: LogEntry,
    /// Set when the state was committed but the log append failed.
    pub log_error: Option<DrierError>,
}

pub struct Controller {
    state: StateStore,
    targets: ConfigManager,
    log: Box<dyn EventLogger + Send + Sync>,
    model: RwLock<Arc<ModelAdapter>>,
    policy: ControlPolicy,
    model_settings: Option<ModelSettings>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl core::fmt::Debug for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("targets", &self.targets)
            .field("policy", &self.policy)
            .field("model_settings", &self.model_settings)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        model: ModelAdapter,
        state: StateStore,
        targets: ConfigManager,
        log: impl EventLogger + Send + Sync + 'static,
    ) -> Self {
        Self {
            state,
            targets,
            log: Box::new(log),
            model: RwLock::new(Arc::new(model)),
            policy: ControlPolicy::default(),
            model_settings: None,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// Open the persisted files named in `settings` and load (or train) the
    /// models. A model failure here means the process must not serve.
    pub fn open(settings: &Settings) -> Result<Self> {
        let model = ModelAdapter::load_or_train(&settings.model)?;
        Ok(Self::open_with_model(settings, model))
    }

    /// Like `open`, with an already constructed model pair.
    pub fn open_with_model(settings: &Settings, model: ModelAdapter) -> Self {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(SystemClock::new());
        Self::open_with(settings, model, clock)
    }

    pub fn open_with(
        settings: &Settings,
        model: ModelAdapter,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let targets = ConfigManager::open(&settings.config_file, settings.targets);
        let initial = ProcessState::initial(clock.now(), targets.get());
        let state = StateStore::open(&settings.snapshot_file, initial);
        let log = CsvEventLogger::new(&settings.log_file);
        tracing::info!(
            config = %settings.config_file.display(),
            snapshot = %settings.snapshot_file.display(),
            log = %settings.log_file.display(),
            heater_cutoff_c = settings.policy.heater_cutoff_c,
            "controller ready"
        );
        Self::new(model, state, targets, log)
            .with_clock(clock)
            .with_policy(settings.policy)
            .with_model_settings(settings.model.clone())
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: ControlPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Enables `retrain`.
    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = Some(settings);
        self
    }

    fn model(&self) -> Arc<ModelAdapter> {
        Arc::clone(&read(&self.model))
    }

    /// Validate a reading, predict, commit the next state and log it.
    ///
    /// Validation, inference and snapshot failures leave the state as it
    /// was. A log failure does not undo the commit; it is returned in
    /// `Applied::log_error`.
    pub fn apply_reading(&self, body: &Value) -> Result<Applied> {
        let reading = Reading::from_json(body)?;
        let targets = self.targets.get();
        let prediction = self.model().predict(&reading.features())?;
        let next = self
            .policy
            .next_state(&reading, prediction, targets, self.clock.now());

        self.state
            .commit(next.clone())
            .map_err(|e| DrierError::Prediction(e.to_string()))?;

        let entry = LogEntry::from_state(&next);
        let log_error = self.log.append(&entry).err();
        if let Some(e) = &log_error {
            tracing::error!(error = %e, "reading committed but not logged");
        }
        tracing::debug!(
            temperature = next.temperature_now,
            humidity = next.humidity_now,
            moisture = next.moisture_content,
            status = %next.clove_status,
            heater = ?next.heater_status,
            fan = ?next.fan_status,
            finish = next.process_finish,
            "reading applied"
        );
        Ok(Applied {
            state: next,
            entry,
            log_error,
        })
    }

    /// Current state with the targets overlaid from the target manager.
    pub fn snapshot(&self) -> ProcessState {
        self.state.get().with_targets(self.targets.get())
    }

    pub fn targets(&self) -> TargetConfig {
        self.targets.get()
    }

    pub fn update_targets(&self, body: &Value) -> Result<TargetConfig> {
        let update = TargetUpdate::from_json(body)?;
        self.targets.set(update)
    }

    /// Retrain from the configured CSV and swap the models in.
    ///
    /// Returns the number of training rows. The running models stay in place
    /// on any failure.
    pub fn retrain(&self) -> Result<usize> {
        let Some(settings) = &self.model_settings else {
            return Err(DrierError::Training(
                "no training source configured".to_string(),
            ));
        };
        let models = train_from_csv(settings)?;
        let samples = models.samples;
        *write(&self.model) = Arc::new(ModelAdapter::from_trained(models));
        tracing::info!(samples, "models retrained");
        Ok(samples)
    }

    pub fn persist_on_shutdown(&self) -> bool {
        self.state.persist_on_shutdown(self.clock.now())
    }
}
