//! Configuration management for the fraud scoring service

use crate::models::inference::DECISION_THRESHOLD;
use crate::models::schema::MissingFeatureFill;
use anyhow::{ensure, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file, optional
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    /// NATS scoring worker; disabled when the section is absent
    pub nats: Option<NatsConfig>,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind the HTTP API to
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Training artifact locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Classifier: `.onnx` model or `.json` logistic coefficients
    pub classifier: PathBuf,
    /// Fitted scaler parameters (JSON)
    pub scaler: PathBuf,
    /// Ordered training feature names (JSON array)
    pub feature_names: PathBuf,
    /// 95th percentile transaction amount (JSON number, optional)
    pub amount_q95: PathBuf,
    /// Number of threads for ONNX inference
    pub onnx_threads: usize,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            classifier: PathBuf::from("models/fraud_best_model.onnx"),
            scaler: PathBuf::from("models/fraud_scaler.json"),
            feature_names: PathBuf::from("models/feature_names.json"),
            amount_q95: PathBuf::from("models/amount_q95.json"),
            onnx_threads: 1,
        }
    }
}

/// Detection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Probability threshold for `is_fraud`
    pub threshold: f64,
    /// Value for schema columns the engineered row lacks
    pub missing_feature_fill: MissingFeatureFill,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DECISION_THRESHOLD,
            missing_feature_fill: MissingFeatureFill::Zero,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum in-flight NATS messages
    pub workers: usize,
    /// Seconds between metrics summaries (0 disables)
    pub metrics_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 30,
        }
    }
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    #[serde(default = "default_transaction_subject")]
    pub transaction_subject: String,
    /// Subject for results of requests sent without a reply subject
    #[serde(default = "default_score_subject")]
    pub score_subject: String,
}

fn default_transaction_subject() -> String {
    "transactions".to_string()
}

fn default_score_subject() -> String {
    "fraud.scores".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file (optional) and `FRAUD__*` environment variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("FRAUD").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (0.0..=1.0).contains(&self.detection.threshold),
            "detection.threshold must be within [0, 1], got {}",
            self.detection.threshold
        );
        ensure!(self.pipeline.workers >= 1, "pipeline.workers must be at least 1");
        ensure!(self.artifacts.onnx_threads >= 1, "artifacts.onnx_threads must be at least 1");
        ensure!(
            matches!(self.logging.format.as_str(), "json" | "pretty"),
            "logging.format must be `json` or `pretty`, got `{}`",
            self.logging.format
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.detection.threshold, 0.230);
        assert_eq!(config.detection.missing_feature_fill, MissingFeatureFill::Zero);
        assert!(config.nats.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[artifacts]
classifier = "artifacts/model.json"

[detection]
missing_feature_fill = "nan"

[nats]
url = "nats://localhost:4222"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.artifacts.classifier, PathBuf::from("artifacts/model.json"));
        assert_eq!(config.artifacts.scaler, PathBuf::from("models/fraud_scaler.json"));
        assert_eq!(config.detection.threshold, DECISION_THRESHOLD);
        assert_eq!(config.detection.missing_feature_fill, MissingFeatureFill::Nan);

        let nats = config.nats.unwrap();
        assert_eq!(nats.transaction_subject, "transactions");
        assert_eq!(nats.score_subject, "fraud.scores");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_path("does/not/exist.toml").unwrap();
        assert_eq!(config.pipeline.workers, 4);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let mut config = AppConfig::default();
        config.detection.threshold = 1.2;
        assert!(config.validate().is_err());
    }
}
