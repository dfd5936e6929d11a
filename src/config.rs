//! Configuration management for the landmark classification server

use crate::labels::{ClassLabels, DEFAULT_CLASS_LABELS};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "LANDMARK_CONFIG";

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub labels: LabelsConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// TCP port to bind
    pub port: u16,
    /// Largest accepted request body, in bytes
    pub body_limit_bytes: usize,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the .tflite model file
    pub path: PathBuf,
    /// Path to the companion model_config.json, if any
    pub manifest_path: Option<PathBuf>,
    /// Width the input image is resized to
    pub input_width: u32,
    /// Height the input image is resized to
    pub input_height: u32,
    /// Number of ranked classes returned in `top_classes`
    pub top_k: usize,
}

/// Class label configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    /// Labels in model output order
    pub classes: Vec<String>,
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries (0 disables them)
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl AppConfig {
    /// Load configuration from `LANDMARK_CONFIG` or the default file path
    pub fn load() -> Result<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// Keys missing from the file fall back to compiled defaults; the file is
    /// optional, and `LANDMARK__SECTION__KEY` environment variables override it.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("LANDMARK")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            anyhow::bail!(
                "model input size must be non-zero, got {}x{}",
                self.model.input_width,
                self.model.input_height
            );
        }
        if self.model.top_k == 0 {
            anyhow::bail!("model.top_k must be at least 1");
        }
        self.class_labels()?;
        Ok(())
    }

    /// Build the validated label list
    pub fn class_labels(&self) -> Result<ClassLabels> {
        ClassLabels::new(self.labels.classes.clone()).context("Invalid labels.classes")
    }

    /// Address string the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("client/public/model/model.tflite"),
            manifest_path: Some(PathBuf::from("client/public/model/model_config.json")),
            input_width: 224,
            input_height: 224,
            top_k: 3,
        }
    }
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            classes: DEFAULT_CLASS_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            report_interval_secs: 300,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
