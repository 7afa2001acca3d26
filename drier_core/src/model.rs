//! Model adapter: the classifier/regressor pair behind one `predict` call.

use std::path::Path;

use drier_model::{ModelPaths, Sample, TrainedModels};
use drier_traits::{Features, MoistureRegressor, StatusClassifier};

use crate::config::ModelSettings;
use crate::error::{DrierError, Result};
use crate::util::round2;

/// Model output for one reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub status: String,
    /// Rounded to two decimals.
    pub moisture_content: f64,
}

pub struct ModelAdapter {
    classifier: Box<dyn StatusClassifier + Send + Sync>,
    regressor: Box<dyn MoistureRegressor + Send + Sync>,
}

impl core::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelAdapter").finish_non_exhaustive()
    }
}

impl ModelAdapter {
    pub fn new(
        classifier: impl StatusClassifier + Send + Sync + 'static,
        regressor: impl MoistureRegressor + Send + Sync + 'static,
    ) -> Self {
        Self {
            classifier: Box::new(classifier),
            regressor: Box::new(regressor),
        }
    }

    pub fn from_trained(models: TrainedModels) -> Self {
        Self::new(models.status, models.moisture)
    }

    pub fn predict(&self, features: &Features) -> Result<Prediction> {
        let status = self
            .classifier
            .classify(features)
            .map_err(|e| DrierError::Prediction(format!("classifier: {e}")))?;
        let raw = self
            .regressor
            .estimate(features)
            .map_err(|e| DrierError::Prediction(format!("regressor: {e}")))?;
        if !raw.is_finite() {
            return Err(DrierError::Prediction(format!(
                "regressor returned non-finite moisture {raw}"
            )));
        }
        Ok(Prediction {
            status,
            moisture_content: round2(raw),
        })
    }

    /// Load both persisted models, or train from the CSV and persist them.
    ///
    /// Fails with `ModelUnavailable` only when both routes fail. Freshly
    /// trained models are served even if they cannot be saved.
    pub fn load_or_train(settings: &ModelSettings) -> Result<Self> {
        let load_err = match TrainedModels::load(&settings.paths) {
            Ok(models) => return Ok(Self::from_trained(models)),
            Err(e) => e,
        };
        tracing::warn!(error = %load_err, "persisted models unavailable, training from CSV");
        let models = train_models(settings).map_err(|train_err| {
            DrierError::ModelUnavailable(format!(
                "load failed ({load_err}); training failed ({train_err})"
            ))
        })?;
        if let Err(e) = save(&models, &settings.paths) {
            tracing::warn!(error = %e, "trained models not saved, retraining on next start");
        }
        Ok(Self::from_trained(models))
    }
}

/// Train both models from `settings.training_csv` and persist them.
pub fn train_from_csv(settings: &ModelSettings) -> Result<TrainedModels> {
    let models = train_models(settings)?;
    save(&models, &settings.paths)?;
    Ok(models)
}

fn train_models(settings: &ModelSettings) -> Result<TrainedModels> {
    let samples = read_samples(&settings.training_csv)?;
    if samples.len() < settings.min_training_rows {
        return Err(DrierError::InsufficientData {
            rows: samples.len(),
            required: settings.min_training_rows,
        });
    }
    TrainedModels::train(&samples, &settings.params)
        .map_err(|e| DrierError::Training(e.to_string()))
}

fn read_samples(path: &Path) -> Result<Vec<Sample>> {
    let rows = drier_config::load_training_csv(path)
        .map_err(|e| DrierError::Training(format!("{e:#}")))?;
    Ok(rows
        .into_iter()
        .map(|r| Sample {
            features: Features::new(r.humidity_now, r.temperature_now, r.time_remaining),
            status: r.status_kering,
            moisture: r.moisture_content,
        })
        .collect())
}

fn save(models: &TrainedModels, paths: &ModelPaths) -> Result<()> {
    models
        .save(paths)
        .map_err(|e| DrierError::Persist(e.to_string()))
}
