use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Used when `RUST_LOG` is unset. `gemchat` covers the binary and, by
/// prefix, `gemchat_core`.
const DEFAULT_FILTER: &str = "info,gemchat=debug";

/// Where and how to write logs. The terminal belongs to the UI, so logs
/// always go to a file.
pub struct LogConfig {
    pub path: PathBuf,
    pub json_format: bool,
}

impl LogConfig {
    pub fn from_env() -> Result<Self> {
        let path = match std::env::var("GEMCHAT_LOG_FILE") {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => dirs::cache_dir()
                .ok_or_else(|| anyhow!("Could not determine cache directory"))?
                .join("gemchat")
                .join("gemchat.log"),
        };

        Ok(Self {
            path,
            json_format: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
        })
    }
}

/// Initialize the tracing subscriber, appending to the configured log file.
pub fn init_tracing(config: &LogConfig) -> Result<()> {
    if let Some(parent) = config.path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.path)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    if config.json_format {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(Mutex::new(file))
                    .with_target(true),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
            .try_init()?;
    }

    tracing::info!(
        path = %config.path.display(),
        json_format = config.json_format,
        "Logging initialized"
    );
    Ok(())
}
