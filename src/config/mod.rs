//! Configuration management for fetchr
//!
//! This module handles loading and validating configuration from defaults,
//! an optional TOML file, environment variables and command-line overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.flickr.com/services/rest/";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote API configuration
    pub flickr: FlickrConfig,

    /// Worker pool configuration
    pub pipeline: PipelineConfig,

    /// Output configuration
    pub output: OutputConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickrConfig {
    /// API key
    pub api_key: String,

    /// User whose photostream is fetched
    pub user_id: String,

    /// REST endpoint
    pub base_url: String,

    /// Page size for listing calls
    pub per_page: u32,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of detail fetch workers
    pub workers: usize,

    /// Capacity of the summary intake queue
    pub intake_capacity: usize,

    /// Capacity of the enriched output queue
    pub output_capacity: usize,

    /// What a single failed detail lookup does to the run
    pub failure_mode: FailureMode,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path of the JSON array file
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

/// Handling of a failed detail lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Stop every worker and fail the run
    #[default]
    Abort,
    /// Record the failure and keep going
    Collect,
}

impl FailureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Abort => "abort",
            Self::Collect => "collect",
        }
    }
}

impl FromStr for FailureMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "collect" => Ok(Self::Collect),
            _ => Err(Error::config(format!(
                "Unknown failure mode: {s}. Valid: abort, collect"
            ))),
        }
    }
}

impl std::fmt::Display for FailureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            user_id: String::new(),
            base_url: String::from(DEFAULT_BASE_URL),
            per_page: 500,
            request_timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 20,
            intake_capacity: 500,
            output_capacity: 10,
            failure_mode: FailureMode::Abort,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Override values with any `FETCHR_*` environment variables that are set
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(v) = std::env::var("FETCHR_API_KEY") {
            self.flickr.api_key = v;
        }
        if let Ok(v) = std::env::var("FETCHR_USER_ID") {
            self.flickr.user_id = v;
        }
        if let Ok(v) = std::env::var("FETCHR_BASE_URL") {
            self.flickr.base_url = v;
        }
        if let Ok(v) = std::env::var("FETCHR_OUTPUT_FILE") {
            self.output.path = PathBuf::from(v);
        }
        if let Some(v) = env_parse::<u64>("FETCHR_REQUEST_TIMEOUT")? {
            self.flickr.request_timeout_secs = v;
        }
        if let Some(v) = env_parse::<usize>("FETCHR_WORKERS")? {
            self.pipeline.workers = v;
        }
        if let Some(v) = env_parse::<usize>("FETCHR_INTAKE_CAPACITY")? {
            self.pipeline.intake_capacity = v;
        }
        if let Some(v) = env_parse::<usize>("FETCHR_OUTPUT_CAPACITY")? {
            self.pipeline.output_capacity = v;
        }
        if let Ok(v) = std::env::var("FETCHR_FAILURE_MODE") {
            self.pipeline.failure_mode = v.parse()?;
        }
        if let Ok(v) = std::env::var("FETCHR_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("FETCHR_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }

    /// Validate configuration values
    ///
    /// Required options are checked first, in the order they are usually
    /// given on the command line.
    pub fn validate(&self) -> Result<()> {
        if self.flickr.api_key.is_empty() {
            return Err(Error::config("api-key option is missing"));
        }

        if self.flickr.user_id.is_empty() {
            return Err(Error::config("user-id option is missing"));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(Error::config("output-file option is missing"));
        }

        if self.flickr.base_url.is_empty() {
            return Err(Error::config("base_url must not be empty"));
        }

        if self.flickr.per_page == 0 {
            return Err(Error::config("per_page must be greater than 0"));
        }

        if self.pipeline.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }

        if self.pipeline.intake_capacity == 0 {
            return Err(Error::config("intake_capacity must be greater than 0"));
        }

        if self.pipeline.output_capacity == 0 {
            return Err(Error::config("output_capacity must be greater than 0"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.flickr.request_timeout_secs)
    }
}

fn env_parse<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {key}: {v}")),
        Err(_) => Ok(None),
    }
}
