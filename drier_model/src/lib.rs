#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Trained models behind the `drier_traits` seam.
//!
//! A decision-tree classifier predicts the dryness label and a regression
//! tree predicts moisture content. Both are trained from the same labelled
//! samples and stored as JSON files next to each other.

pub mod atomic;
pub mod error;
pub mod persist;
pub mod tree;

use std::path::PathBuf;

use drier_traits::Features;

pub use error::{ModelError, Result};
pub use tree::{Node, TreeClassifier, TreeParams, TreeRegressor};

/// One labelled observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Features,
    pub status: String,
    pub moisture: f64,
}

/// Where the two model files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    pub status: PathBuf,
    pub moisture: PathBuf,
}

/// A classifier/regressor pair trained on the same samples.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub status: TreeClassifier,
    pub moisture: TreeRegressor,
    pub samples: usize,
}

impl TrainedModels {
    pub fn train(samples: &[Sample], params: &TreeParams) -> Result<Self> {
        let status = TreeClassifier::fit(samples, params)?;
        let moisture = TreeRegressor::fit(samples, params)?;
        tracing::info!(
            samples = samples.len(),
            classes = status.classes().len(),
            status_depth = status.root().depth(),
            moisture_depth = moisture.root().depth(),
            moisture_leaves = moisture.root().leaves(),
            "models trained"
        );
        Ok(Self {
            status,
            moisture,
            samples: samples.len(),
        })
    }

    pub fn load(paths: &ModelPaths) -> Result<Self> {
        let status: TreeClassifier = persist::load(&paths.status)?;
        let moisture: TreeRegressor = persist::load(&paths.moisture)?;
        tracing::info!(
            status = %paths.status.display(),
            moisture = %paths.moisture.display(),
            "models loaded"
        );
        Ok(Self {
            status,
            moisture,
            samples: 0,
        })
    }

    /// Both files are staged before either is replaced, so a failure while
    /// writing leaves both destinations untouched.
    pub fn save(&self, paths: &ModelPaths) -> Result<()> {
        let status = persist::stage(&self.status, self.samples, &paths.status)?;
        let moisture = match persist::stage(&self.moisture, self.samples, &paths.moisture) {
            Ok(staged) => staged,
            Err(e) => {
                status.discard();
                return Err(e);
            }
        };
        if let Err(source) = status.commit() {
            moisture.discard();
            return Err(ModelError::Io {
                path: paths.status.display().to_string(),
                source,
            });
        }
        moisture.commit().map_err(|source| ModelError::Io {
            path: paths.moisture.display().to_string(),
            source,
        })?;
        tracing::debug!(
            status = %paths.status.display(),
            moisture = %paths.moisture.display(),
            "models saved"
        );
        Ok(())
    }
}
