mod cli;
mod commands;
mod error_fmt;
mod logging;
mod server;

use clap::Parser;
use drier_core::Settings;
use eyre::WrapErr;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("color-eyre not installed: {e}");
    }

    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        std::process::exit(exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let mut cfg = drier_config::load_file(&cli.config)?;
    if let Commands::Serve { bind: Some(bind) } = &cli.cmd {
        cfg.server.bind.clone_from(bind);
    }
    if let Commands::Train { csv: Some(csv) } = &cli.cmd {
        cfg.paths.training_csv.clone_from(csv);
    }
    cfg.validate().wrap_err("invalid configuration")?;
    logging::init(&cfg.logging, cli.log_level.as_deref(), cli.json)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    let settings = Settings::from(&cfg);
    match cli.cmd {
        Commands::Serve { .. } => commands::serve(&cfg, &settings),
        Commands::Train { .. } => commands::train(&settings, cli.json),
        Commands::Predict {
            temperature,
            humidity,
            time_remaining,
            rtc,
            elapsed_time,
        } => commands::predict(
            &settings,
            commands::ReadingArgs {
                temperature,
                humidity,
                time_remaining,
                rtc,
                elapsed_time,
            },
        ),
        Commands::Status => commands::status(&settings),
        Commands::SetTarget { moisture, time } => commands::set_target(&settings, moisture, time),
        Commands::SelfCheck => commands::self_check(&settings),
    }
}
