//! Human-readable error descriptions and structured JSON error formatting.

use drier_core::DrierError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(de) = err.downcast_ref::<DrierError>() {
        return match de {
            DrierError::ModelUnavailable(msg) => format!(
                "What happened: No usable models ({msg}).\nLikely causes: Model files missing or corrupt and the training CSV is absent or too small.\nHow to fix: Check paths.status_model, paths.moisture_model and paths.training_csv, then run `drier train`."
            ),
            DrierError::InsufficientData { rows, required } => format!(
                "What happened: The training CSV has {rows} rows; at least {required} are needed.\nLikely causes: Truncated or freshly created data file.\nHow to fix: Add rows to paths.training_csv or lower model.min_training_rows."
            ),
            DrierError::InvalidInput { .. } => format!(
                "What happened: {de}.\nLikely causes: A sensor value was omitted or is not a finite number.\nHow to fix: Pass --temperature, --humidity and --time-remaining as numbers."
            ),
            DrierError::InvalidConfig(msg) => format!(
                "What happened: Invalid target ({msg}).\nLikely causes: Non-numeric target value.\nHow to fix: Pass integers to --moisture and --time."
            ),
            DrierError::Persist(msg) => format!(
                "What happened: A state file could not be written ({msg}).\nLikely causes: Read-only directory or full disk.\nHow to fix: Check permissions on the paths in the [paths] section."
            ),
            _ => format!(
                "What happened: {de}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("invalid configuration") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("parse config") {
        return format!(
            "What happened: The config file is not valid TOML ({msg}).\nHow to fix: Fix the syntax or remove the file to use defaults."
        );
    }

    if lower.contains("training csv must have headers") {
        return "Invalid headers in training CSV. Expected 'humidity_now,temperature_now,time_remaining,status_kering,moisture_content'.".to_string();
    }

    if lower.contains("bind") && (lower.contains("in use") || lower.contains("permission")) {
        return format!(
            "What happened: Could not open the listening socket ({msg}).\nHow to fix: Pick another port with --bind or stop the other process."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error class; anything untyped is 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<DrierError>() {
        Some(DrierError::InvalidInput { .. } | DrierError::InvalidConfig(_)) => 2,
        Some(DrierError::ModelUnavailable(_)) => 3,
        Some(DrierError::InsufficientData { .. }) => 4,
        Some(DrierError::Persist(_) | DrierError::EventLog(_)) => 5,
        _ => 1,
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    if let Some(de) = err.downcast_ref::<DrierError>() {
        let mut obj = json!({ "reason": reason_name(de), "message": humanize(err) });
        let fields = de.offending_fields();
        if !fields.is_empty() {
            obj["required_fields"] = json!(fields);
        }
        return obj.to_string();
    }
    json!({ "reason": "Error", "message": humanize(err) }).to_string()
}

pub fn reason_name(err: &DrierError) -> &'static str {
    match err {
        DrierError::ModelUnavailable(_) => "ModelUnavailable",
        DrierError::InvalidInput { .. } => "InvalidInput",
        DrierError::InvalidConfig(_) => "InvalidConfig",
        DrierError::Prediction(_) => "PredictionError",
        DrierError::Persist(_) => "PersistError",
        DrierError::EventLog(_) => "EventLogError",
        DrierError::InsufficientData { .. } => "InsufficientData",
        DrierError::Training(_) => "TrainingError",
    }
}
