pub mod api;
pub mod error;
pub mod job;
pub mod logging;
pub mod utils;
pub mod webhook;

use error::{HookError, Result};
use job::BuildDispatcher;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_TARGET_REF: &str = "refs/heads/main";
pub const DEFAULT_APP_NAME: &str = "push-build-hook";
pub const DEFAULT_LOG_FILE: &str = "logs/webhook.log";

#[derive(Debug, Deserialize, Clone)]
pub struct HookConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default)]
    pub secret: String,
    pub build_script: PathBuf,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_target_ref")]
    pub target_ref: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_console_log")]
    pub console_log: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_host() -> String {
    DEFAULT_BIND_HOST.to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_FILE)
}

fn default_target_ref() -> String {
    DEFAULT_TARGET_REF.to_string()
}

fn default_app_name() -> String {
    DEFAULT_APP_NAME.to_string()
}

fn default_console_log() -> bool {
    true
}

impl HookConfig {
    /// Parse a config from TOML text. Overrides are not applied.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Replace file values with `WEBHOOK_SECRET` / `HOOK_PORT` style overrides.
    ///
    /// `lookup` is normally `std::env::var(..).ok()`.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("WEBHOOK_SECRET") {
            self.secret = secret;
        }
        if let Some(port) = lookup("HOOK_PORT") {
            self.port = port.trim().parse().map_err(|e| {
                HookError::ConfigError(format!("Invalid HOOK_PORT '{}': {}", port, e))
            })?;
        }
        Ok(self)
    }

    /// Returns true if a valid (non-empty) secret is set.
    pub fn has_valid_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Checks the invariants the listener relies on at startup.
    pub fn validate(&self) -> Result<()> {
        if !self.has_valid_secret() {
            return Err(HookError::ConfigError(
                "A webhook secret is required (set `secret` or WEBHOOK_SECRET)".to_string(),
            ));
        }
        if self.build_script.as_os_str().is_empty() {
            return Err(HookError::ConfigError(
                "`build_script` must not be empty".to_string(),
            ));
        }
        if self.target_ref.is_empty() {
            return Err(HookError::ConfigError(
                "`target_ref` must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Load, override and validate the configuration file
pub fn load_config(path: impl AsRef<Path>) -> Result<HookConfig> {
    let path = path.as_ref();
    let config_str = std::fs::read_to_string(path).map_err(|e| {
        HookError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config = HookConfig::from_toml_str(&config_str).map_err(|e| {
        HookError::ConfigError(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config = config.apply_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

pub struct AppState {
    pub config: HookConfig,
    pub dispatcher: Arc<dyn BuildDispatcher>,
}

pub type SharedState = Arc<AppState>;
