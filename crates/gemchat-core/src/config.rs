use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::ai::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::chat::{SessionSettings, DEFAULT_MAX_OUTPUT_TOKENS};
use crate::pending::ConcurrencyMode;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const MODEL_ENV: &str = "GEMINI_MODEL";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_output_tokens: Option<u32>,
    pub concurrency: Option<ConcurrencyMode>,
    /// Seconds before a pending request is abandoned; unset means wait forever
    pub request_timeout_secs: Option<u64>,
    pub base_url: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            model: Some(DEFAULT_MODEL.to_string()),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    /// Read the config at `path`. A missing file is created with defaults so
    /// there is something to edit.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::new();
            match config.save_to(path) {
                Ok(()) => tracing::info!(path = %path.display(), "Wrote default config"),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not write default config")
                }
            }
            return Ok(config);
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Environment first, then the config file
    pub fn resolve_api_key(&self) -> Result<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.is_empty()))
            .ok_or_else(|| {
                anyhow!(
                    "No Gemini API key found. Set {} or add \"api_key\" to {}",
                    API_KEY_ENV,
                    Self::get_config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|_| "the config file".to_string())
                )
            })
    }

    pub fn resolve_model(&self) -> String {
        std::env::var(MODEL_ENV)
            .ok()
            .filter(|m| !m.is_empty())
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            max_output_tokens: self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            concurrency: self.concurrency.unwrap_or_default(),
            ..SessionSettings::default()
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("gemchat").join("config.json"))
    }
}
