//! Subcommand implementations. Each one works on the same persisted files as
//! the server.

use std::net::SocketAddr;
use std::sync::Arc;

use drier_core::{
    ConfigManager, Controller, DrierError, ProcessState, Settings, StateStore, TargetUpdate,
    train_from_csv,
};
use drier_traits::{Clock, SystemClock};
use eyre::WrapErr;
use serde_json::{Value, json};

use crate::server;

pub fn serve(cfg: &drier_config::Config, settings: &Settings) -> eyre::Result<()> {
    let addr: SocketAddr = cfg
        .server
        .bind
        .parse()
        .wrap_err_with(|| format!("server.bind {:?}", cfg.server.bind))?;
    let ctrl = Arc::new(Controller::open(settings)?);
    let max_body = cfg.server.max_body_bytes;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("start async runtime")?;
    rt.block_on(async move {
        let listener = server::bind(addr).await?;
        server::run(listener, ctrl, max_body, server::ctrl_c()).await
    })
}

pub fn train(settings: &Settings, json_out: bool) -> eyre::Result<()> {
    let models = train_from_csv(&settings.model)?;
    let out = json!({
        "status": "success",
        "samples": models.samples,
        "classes": models.status.classes(),
        "status_model": settings.model.paths.status.display().to_string(),
        "moisture_model": settings.model.paths.moisture.display().to_string(),
    });
    if json_out {
        println!("{out}");
    } else {
        println!(
            "trained on {} rows; classes: {}",
            models.samples,
            models.status.classes().join(", ")
        );
    }
    Ok(())
}

pub struct ReadingArgs {
    pub temperature: f64,
    pub humidity: f64,
    pub time_remaining: f64,
    pub rtc: Option<String>,
    pub elapsed_time: Option<String>,
}

pub fn predict(settings: &Settings, args: ReadingArgs) -> eyre::Result<()> {
    let ctrl = Controller::open(settings)?;
    let mut body = json!({
        "temperature_now": args.temperature,
        "humidity_now": args.humidity,
        "time_remaining": args.time_remaining,
    });
    if let Some(rtc) = args.rtc {
        body["rtc"] = Value::String(rtc);
    }
    if let Some(e) = args.elapsed_time {
        body["elapsed_time"] = Value::String(e);
    }
    let applied = ctrl.apply_reading(&body)?;
    if let Some(e) = &applied.log_error {
        eprintln!("warning: {e}");
    }
    print_state(&applied.state)
}

fn open_targets(settings: &Settings) -> ConfigManager {
    ConfigManager::open(&settings.config_file, settings.targets)
}

pub fn status(settings: &Settings) -> eyre::Result<()> {
    let targets = open_targets(settings);
    let store = StateStore::open(
        &settings.snapshot_file,
        ProcessState::initial(SystemClock.now(), targets.get()),
    );
    print_state(&store.get().with_targets(targets.get()))
}

pub fn set_target(
    settings: &Settings,
    moisture: Option<i64>,
    time: Option<i64>,
) -> eyre::Result<()> {
    if moisture.is_none() && time.is_none() {
        return Err(DrierError::InvalidConfig(
            "pass --moisture and/or --time".to_string(),
        )
        .into());
    }
    let next = open_targets(settings).set(TargetUpdate {
        target_moisture: moisture,
        target_time: time,
    })?;
    println!(
        "{}",
        json!({"target_moisture": next.target_moisture, "target_time": next.target_time})
    );
    Ok(())
}

/// Validate that the process could start serving, without writing anything.
pub fn self_check(settings: &Settings) -> eyre::Result<()> {
    match drier_model::TrainedModels::load(&settings.model.paths) {
        Ok(_) => println!("models: loaded"),
        Err(load_err) => {
            let rows = drier_config::load_training_csv(&settings.model.training_csv)
                .map_err(|e| {
                    DrierError::ModelUnavailable(format!("{load_err}; training CSV: {e:#}"))
                })?
                .len();
            if rows < settings.model.min_training_rows {
                return Err(DrierError::ModelUnavailable(format!(
                    "{load_err}; training CSV has {rows} rows, need {}",
                    settings.model.min_training_rows
                ))
                .into());
            }
            println!("models: not saved yet, trainable from {rows} CSV rows");
        }
    }
    println!("OK");
    Ok(())
}

fn print_state(state: &ProcessState) -> eyre::Result<()> {
    let text = serde_json::to_string_pretty(state).wrap_err("encode state")?;
    println!("{text}");
    Ok(())
}
