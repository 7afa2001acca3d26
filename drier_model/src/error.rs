use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no training samples")]
    NoSamples,
    #[error("training sample {index} has non-finite values")]
    NonFinite { index: usize },
    #[error("model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("model file {path} is not a valid model: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("model file {path} holds a {found} model, expected {expected}")]
    WrongKind {
        path: String,
        found: String,
        expected: &'static str,
    },
    #[error("model file {path} references unknown features or classes")]
    Malformed { path: String },
    #[error("model file {path} uses format {found}, this build reads format {expected}")]
    WrongFormat {
        path: String,
        found: u32,
        expected: u32,
    },
}

pub type Result<T> = std::result::Result<T, ModelError>;
