//! Runtime configuration.
//!
//! Values come from (highest priority first) CLI flags, the environment, a
//! `.env` file in the working directory, then built-in defaults.

use std::path::PathBuf;

use reqwest::Url;

use crate::cli::GlobalArgs;
use crate::error::AppError;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const ENV_API_URL: &str = "MORTGAGE_API_URL";
pub const ENV_SAMPLE_URL: &str = "MORTGAGE_SAMPLE_URL";
pub const ENV_LOG_LEVEL: &str = "MORTGAGE_LOG";
pub const ENV_LOG_FILE: &str = "MORTGAGE_LOG_FILE";
pub const ENV_STATE_DIR: &str = "MORTGAGE_STATE_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the prediction service; `/predict` is appended.
    pub api_url: String,
    /// Remote sample spreadsheet; the bundled copy is used when unset.
    pub sample_url: Option<String>,
    pub log_level: String,
    /// Log destination while the TUI owns the terminal.
    pub log_file: PathBuf,
    /// Session scratch directory, emptied once at startup.
    pub state_dir: PathBuf,
}

impl AppConfig {
    /// Load from `.env` + process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_dir = std::env::temp_dir().join("mortgage-wizard");
        let config = Self {
            api_url: get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            sample_url: get(ENV_SAMPLE_URL),
            log_level: get(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_file: get(ENV_LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("mortgage.log")),
            state_dir: get(ENV_STATE_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| base_dir.join("session")),
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI overrides on top of the environment.
    pub fn with_overrides(mut self, args: &GlobalArgs) -> Result<Self, AppError> {
        if let Some(url) = &args.endpoint {
            self.api_url = url.clone();
        }
        if let Some(url) = &args.sample_url {
            self.sample_url = Some(url.clone());
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), AppError> {
        validate_http_url("prediction service URL", &self.api_url)?;
        if let Some(url) = &self.sample_url {
            validate_http_url("sample URL", url)?;
        }
        Ok(())
    }
}

fn validate_http_url(what: &str, raw: &str) -> Result<(), AppError> {
    let url = Url::parse(raw).map_err(|e| AppError::config(format!("Invalid {what} '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::config(format!(
            "Invalid {what} '{raw}': unsupported scheme '{other}' (expected http or https)."
        ))),
    }
}
