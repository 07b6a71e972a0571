mod cli;
mod commands;
mod error_fmt;

use std::path::Path;

use adr_core::error::{AdrError, Result};
use clap::Parser;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::commands::ServoRun;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = run(cli) {
        let json = JSON_MODE.get().copied().unwrap_or(false);
        if json {
            eprintln!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn run(cli: Cli) -> Result<()> {
    color_eyre::install()?;

    let cfg = match cli.config.as_deref() {
        Some(path) => load_config(path)?,
        None => adr_config::Config::default(),
    };
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "configuration ready");

    match cli.cmd {
        Commands::Encode { word, address } => commands::run_encode(&cfg, word, address, cli.json),
        Commands::Decode { bytes } => commands::run_decode(&bytes, cli.json),
        Commands::Classify { ohms, factor } => commands::run_classify(ohms, factor, cli.json),
        Commands::Bad16 { cmd } => commands::run_bad16(&cfg, &cmd, cli.json),
        Commands::Servo {
            target,
            tolerance,
            timeout_s,
            start,
            heater,
            resistance,
            range,
            rms_uk,
        } => commands::run_servo(
            &cfg,
            ServoRun {
                target,
                tolerance,
                timeout_s,
                start,
                heater,
                resistance,
                range,
                rms_uk,
            },
            cli.json,
        ),
        Commands::Demags { logs, magup_max } => {
            commands::run_demags(&cfg, &logs, magup_max, cli.json)
        }
    }
}

/// Read, parse and validate the config file. Every failure here is a
/// configuration error so the process exits with the config code.
fn load_config(path: &Path) -> Result<adr_config::Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AdrError::Config(format!("read {}: {e}", path.display())))?;
    let cfg = toml::from_str::<adr_config::Config>(&text)
        .map_err(|e| AdrError::Config(format!("parse {}: {e}", path.display())))?;
    cfg.validate()
        .map_err(|e| AdrError::Config(e.to_string()))
        .wrap_err_with(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Console logs go to stderr so stdout stays clean for command output.
/// RUST_LOG wins over --log-level, which wins over [logging].level.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &adr_config::Logging) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => {
            let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
            EnvFilter::try_new(level)
                .map_err(|e| AdrError::Config(format!("log level {level:?}: {e}")))?
        }
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        layers.push(console.json().boxed());
    } else {
        layers.push(console.boxed());
    }

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| AdrError::Config(format!("logging.file {file:?} has no file name")))?;
        let appender = match logging.rotation.as_deref().unwrap_or("never") {
            "never" => tracing_appender::rolling::never(dir, name),
            "daily" => tracing_appender::rolling::daily(dir, name),
            "hourly" => tracing_appender::rolling::hourly(dir, name),
            other => {
                return Err(AdrError::Config(format!(
                    "logging.rotation must be never, daily or hourly, got {other:?}"
                ))
                .into());
            }
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        layers.push(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("adr.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn config_file_sections_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[card]\naddress = 5\n\n[stability]\npoll_s = 2\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.card.address, 5);
        assert_eq!(cfg.stability.poll_s, 2);
        assert_eq!(cfg.servo.channel, 1);
    }

    #[test]
    fn unknown_value_type_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "[servo]\nchannel = \"one\"\n");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AdrError>(),
            Some(AdrError::Config(msg)) if msg.starts_with("parse ")
        ));
        assert_eq!(error_fmt::exit_code_for_error(&err), 5);
    }
}
