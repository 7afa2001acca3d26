use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DrierError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("{}", describe_fields(.missing, .invalid))]
    InvalidInput {
        missing: Vec<&'static str>,
        invalid: Vec<&'static str>,
    },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("prediction failed: {0}")]
    Prediction(String),
    #[error("persistence failed: {0}")]
    Persist(String),
    #[error("event log append failed: {0}")]
    EventLog(String),
    #[error("not enough training data: got {rows} rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },
    #[error("training failed: {0}")]
    Training(String),
}

impl DrierError {
    /// Fields a client has to fix, missing ones first.
    pub fn offending_fields(&self) -> Vec<&'static str> {
        match self {
            DrierError::InvalidInput { missing, invalid } => {
                missing.iter().chain(invalid.iter()).copied().collect()
            }
            _ => Vec::new(),
        }
    }
}

fn describe_fields(missing: &[&'static str], invalid: &[&'static str]) -> String {
    let mut msg = String::new();
    if !missing.is_empty() {
        msg.push_str("incomplete sensor data: missing ");
        msg.push_str(&missing.join(", "));
    }
    if !invalid.is_empty() {
        if msg.is_empty() {
            msg.push_str("invalid sensor data: ");
        } else {
            msg.push_str("; invalid ");
        }
        msg.push_str(&invalid.join(", "));
        msg.push_str(" (expected finite numbers)");
    }
    msg
}

pub type Result<T, E = DrierError> = std::result::Result<T, E>;
