//! Configuration management for the `dresscast` backend
//!
//! Handles loading configuration from an optional `config.toml` and
//! `DRESSCAST_`-prefixed environment variables, and provides validation for
//! all configuration settings. Configuration is loaded once at process start
//! and passed read-only into the server and pipeline.

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::DresscastError;

/// Root configuration structure for the `dresscast` backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DresscastConfig {
    /// Generative model configuration
    pub gemini: GeminiConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Generative model configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key for the Generative Language API
    pub api_key: Option<String>,
    /// Model name
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Base URL for the Generative Language API
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Total attempts per model call (including the first)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// When true, skip the model entirely and serve a canned payload
    #[serde(default)]
    pub mock_mode: bool,
}

/// HTTP server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to bind on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Origins allowed to call the API; "*" allows any origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Rate-limit window length in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_seconds: u64,
    /// Maximum requests per client IP per window
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max_requests: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u32 {
    45
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_rate_limit_window() -> u64 {
    15 * 60
}

fn default_rate_limit_max() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DresscastConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: None,
                model: default_gemini_model(),
                base_url: default_gemini_base_url(),
                max_retries: default_max_retries(),
                mock_mode: false,
            },
            server: ServerConfig {
                port: default_port(),
                request_timeout_seconds: default_request_timeout(),
                allowed_origins: default_allowed_origins(),
                rate_limit_window_seconds: default_rate_limit_window(),
                rate_limit_max_requests: default_rate_limit_max(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
        }
    }
}

impl DresscastConfig {
    /// Load configuration from `config.toml` (if present) and environment
    /// variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from a specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("config.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Environment overrides, e.g. DRESSCAST_GEMINI__MODEL,
        // DRESSCAST_SERVER__ALLOWED_ORIGINS="https://a.example,https://b.example"
        builder = builder.add_source(
            Environment::with_prefix("DRESSCAST")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.allowed_origins"),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: DresscastConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.gemini.model.is_empty() {
            self.gemini.model = default_gemini_model();
        }
        if self.gemini.base_url.is_empty() {
            self.gemini.base_url = default_gemini_base_url();
        }
        if self.gemini.max_retries == 0 {
            self.gemini.max_retries = default_max_retries();
        }
        if self.server.request_timeout_seconds == 0 {
            self.server.request_timeout_seconds = default_request_timeout();
        }
        if self.server.allowed_origins.is_empty() {
            self.server.allowed_origins = default_allowed_origins();
        }
        if self.server.rate_limit_window_seconds == 0 {
            self.server.rate_limit_window_seconds = default_rate_limit_window();
        }
        if self.server.rate_limit_max_requests == 0 {
            self.server.rate_limit_max_requests = default_rate_limit_max();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.gemini.max_retries > 10 {
            return Err(DresscastError::config("Gemini max retries cannot exceed 10").into());
        }

        if !self.gemini.base_url.starts_with("http://")
            && !self.gemini.base_url.starts_with("https://")
        {
            return Err(DresscastError::config(
                "Gemini base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.server.request_timeout_seconds > 300 {
            return Err(DresscastError::config(
                "Request timeout cannot exceed 300 seconds",
            )
            .into());
        }

        if self.server.rate_limit_window_seconds > 24 * 60 * 60 {
            return Err(DresscastError::config(
                "Rate limit window cannot exceed 24 hours",
            )
            .into());
        }

        for origin in &self.server.allowed_origins {
            if origin != "*" && !origin.starts_with("http://") && !origin.starts_with("https://") {
                return Err(DresscastError::config(format!(
                    "Allowed origin '{origin}' must be '*' or an http(s) origin"
                ))
                .into());
            }
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(DresscastError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        if !self.gemini.mock_mode && self.gemini.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(DresscastError::config(
                "A Gemini API key is required unless mock mode is enabled",
            )
            .into());
        }

        Ok(())
    }
}
