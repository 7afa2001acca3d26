//! JSON model files.
//!
//! Each file wraps the tree in an envelope naming its kind and format so a
//! classifier can never be loaded where the regressor is expected.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::atomic::{self, Staged};
use crate::error::{ModelError, Result};
use crate::tree::{TreeClassifier, TreeRegressor};

pub const FORMAT: u32 = 1;

pub trait Persisted: Serialize + DeserializeOwned {
    const KIND: &'static str;

    fn well_formed(&self) -> bool;
}

impl Persisted for TreeClassifier {
    const KIND: &'static str = "status_classifier";

    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

impl Persisted for TreeRegressor {
    const KIND: &'static str = "moisture_regressor";

    fn well_formed(&self) -> bool {
        self.is_well_formed()
    }
}

#[derive(Serialize)]
struct EnvelopeOut<'a, M> {
    kind: &'static str,
    format: u32,
    samples: usize,
    model: &'a M,
}

// The model stays untyped until kind and format have been checked.
#[derive(Deserialize)]
struct EnvelopeIn {
    kind: String,
    format: u32,
    model: serde_json::Value,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ModelError + '_ {
    move |source| ModelError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn format_err(path: &Path) -> impl FnOnce(serde_json::Error) -> ModelError + '_ {
    move |source| ModelError::Format {
        path: path.display().to_string(),
        source,
    }
}

/// Write `model` to the temp file next to `path` without replacing `path`.
pub fn stage<M: Persisted>(model: &M, samples: usize, path: &Path) -> Result<Staged> {
    let envelope = EnvelopeOut {
        kind: M::KIND,
        format: FORMAT,
        samples,
        model,
    };
    let bytes = serde_json::to_vec(&envelope).map_err(format_err(path))?;
    atomic::stage(path, &bytes).map_err(io_err(path))
}

/// Write `model` to `path` through a sibling temp file and rename.
pub fn save<M: Persisted>(model: &M, samples: usize, path: &Path) -> Result<()> {
    stage(model, samples, path)?.commit().map_err(io_err(path))
}

pub fn load<M: Persisted>(path: &Path) -> Result<M> {
    let bytes = fs::read(path).map_err(io_err(path))?;
    let envelope: EnvelopeIn = serde_json::from_slice(&bytes).map_err(format_err(path))?;
    if envelope.kind != M::KIND {
        return Err(ModelError::WrongKind {
            path: path.display().to_string(),
            found: envelope.kind,
            expected: M::KIND,
        });
    }
    if envelope.format != FORMAT {
        return Err(ModelError::WrongFormat {
            path: path.display().to_string(),
            found: envelope.format,
            expected: FORMAT,
        });
    }
    let model: M = serde_json::from_value(envelope.model).map_err(format_err(path))?;
    if !model.well_formed() {
        return Err(ModelError::Malformed {
            path: path.display().to_string(),
        });
    }
    Ok(model)
}
