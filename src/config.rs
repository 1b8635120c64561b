//! YAML configuration.
//!
//! Every field has a default, so the file is optional. Example:
//!
//! ```yaml
//! api_kind: gemini
//! model: gemini-2.0-flash
//! fetch:
//!   max_concurrency: 10
//!   deadline_secs: 180
//!   request_timeout_secs: 60
//!   extract_text: false
//! ```

use crate::api::ApiKind;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_kind: ApiKind,
    pub model: String,
    /// Overrides the endpoint implied by `api_kind`.
    pub api_base: Option<String>,
    /// Environment variable holding the API key. Defaults per `api_kind`.
    pub api_key_env: Option<String>,
    /// Timeout for a single AI request.
    pub llm_timeout_secs: u64,
    pub fetch: FetchConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_kind: ApiKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            api_base: None,
            api_key_env: None,
            llm_timeout_secs: 120,
            fetch: FetchConfig::default(),
        }
    }
}

/// Settings for the page fetch stage.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum simultaneous page fetches.
    pub max_concurrency: usize,
    /// Global deadline for fetching all pages of one feed.
    pub deadline_secs: u64,
    /// Timeout for one HTTP request.
    pub request_timeout_secs: u64,
    /// Reduce fetched HTML to its visible text.
    pub extract_text: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            deadline_secs: 180,
            request_timeout_secs: 60,
            extract_text: false,
        }
    }
}

impl FetchConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AppConfig {
    /// Load and validate a config file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&raw)?;
        info!(api_kind = %config.api_kind, model = %config.model, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(raw)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "fetch.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.fetch.deadline_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.deadline_secs must be at least 1".to_string(),
            ));
        }
        if self.fetch.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "fetch.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "llm_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api_base
            .as_deref()
            .unwrap_or_else(|| self.api_kind.default_base_url())
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.api_kind.default_api_key_env())
    }
}
