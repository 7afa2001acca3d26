//! HTTP contract, independent of the transport.
//!
//! Each handler maps a request body to a status code and a JSON body. The
//! server in `drier_cli` only moves bytes.

use serde_json::{Map, Value, json};

use crate::controller::Controller;
use crate::engine::REQUIRED_FIELDS;
use crate::error::DrierError;
use crate::state::ProcessState;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.body.to_string().into_bytes()
    }
}

/// HTTP status for an error.
pub fn status_code(err: &DrierError) -> u16 {
    match err {
        DrierError::InvalidInput { .. }
        | DrierError::InvalidConfig(_)
        | DrierError::InsufficientData { .. } => 400,
        DrierError::ModelUnavailable(_)
        | DrierError::Prediction(_)
        | DrierError::Persist(_)
        | DrierError::EventLog(_)
        | DrierError::Training(_) => 500,
    }
}

pub fn error_response(err: &DrierError) -> ApiResponse {
    let mut body = json!({"status": "error", "message": err.to_string()});
    if matches!(err, DrierError::InvalidInput { .. }) {
        body["required_fields"] = json!(err.offending_fields());
    }
    ApiResponse::new(status_code(err), body)
}

fn message(status: u16, msg: impl Into<String>) -> ApiResponse {
    ApiResponse::new(status, json!({"status": "error", "message": msg.into()}))
}

/// Empty bodies read as `{}`.
fn parse_body(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(bytes)
}

/// The state with `"status": "success"` added, as `/predict` answers.
fn state_body(state: &ProcessState) -> Value {
    let mut body = match serde_json::to_value(state) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    body.insert("status".into(), json!("success"));
    Value::Object(body)
}

pub fn predict(ctrl: &Controller, body: &[u8]) -> ApiResponse {
    let value = match parse_body(body) {
        Ok(v) => v,
        Err(e) => {
            let mut resp = message(400, format!("invalid JSON body: {e}"));
            resp.body["required_fields"] = json!(REQUIRED_FIELDS);
            return resp;
        }
    };
    match ctrl.apply_reading(&value) {
        Ok(applied) => {
            let mut body = state_body(&applied.state);
            if let Some(e) = applied.log_error {
                body["warning"] = json!(e.to_string());
            }
            ApiResponse::new(200, body)
        }
        Err(e) => {
            if status_code(&e) >= 500 {
                tracing::error!(error = %e, "predict failed");
            } else {
                tracing::debug!(error = %e, "reading rejected");
            }
            error_response(&e)
        }
    }
}

/// The current state exactly as stored, without a `status` key.
pub fn get_data(ctrl: &Controller) -> ApiResponse {
    match serde_json::to_value(ctrl.snapshot()) {
        Ok(body) => ApiResponse::new(200, body),
        Err(e) => message(500, format!("encode state: {e}")),
    }
}

pub fn update_target(ctrl: &Controller, body: &[u8]) -> ApiResponse {
    let value = match parse_body(body) {
        Ok(v) => v,
        Err(e) => return message(400, format!("invalid JSON body: {e}")),
    };
    match ctrl.update_targets(&value) {
        Ok(t) => ApiResponse::new(
            200,
            json!({
                "status": "success",
                "target_moisture": t.target_moisture,
                "target_time": t.target_time,
            }),
        ),
        Err(e) => {
            if status_code(&e) >= 500 {
                tracing::error!(error = %e, "target update not persisted");
            }
            error_response(&e)
        }
    }
}

pub fn retrain(ctrl: &Controller) -> ApiResponse {
    match ctrl.retrain() {
        Ok(samples) => ApiResponse::new(
            200,
            json!({
                "status": "success",
                "message": "models retrained",
                "samples": samples,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "retrain failed");
            error_response(&e)
        }
    }
}

pub fn health() -> ApiResponse {
    ApiResponse::new(200, json!({"status": "ok"}))
}

/// Dispatch on method and path; unknown paths are 404, known paths with
/// the wrong method 405.
pub fn handle(ctrl: &Controller, method: &str, path: &str, body: &[u8]) -> ApiResponse {
    let Some(allowed) = allowed_method(path) else {
        return message(404, format!("no route for {path}"));
    };
    if !method.eq_ignore_ascii_case(allowed) {
        return message(405, format!("{path} accepts {allowed} only"));
    }
    match path {
        "/predict" => predict(ctrl, body),
        "/update-target" => update_target(ctrl, body),
        "/retrain" => retrain(ctrl),
        "/get-data" => get_data(ctrl),
        _ => health(),
    }
}

/// `Allow` header value for a known path.
pub fn allowed_method(path: &str) -> Option<&'static str> {
    match path {
        "/predict" | "/update-target" | "/retrain" => Some("POST"),
        "/get-data" | "/health" => Some("GET"),
        _ => None,
    }
}
