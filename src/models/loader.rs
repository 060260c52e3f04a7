//! Startup loader for the training artifacts

use crate::config::ArtifactsConfig;
use crate::error::ArtifactError;
use crate::feature_extractor::DEFAULT_AMOUNT_Q95;
use crate::models::classifier::{Classifier, LogisticClassifier, OnnxClassifier};
use crate::models::scaler::Scaler;
use crate::models::schema::FeatureSchema;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Large-transaction cutoff together with where it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountCutoff {
    pub value: f64,
    /// True when the artifact was unavailable and [`DEFAULT_AMOUNT_Q95`] is in use
    pub fallback: bool,
}

/// Everything the scoring pipeline reads, immutable once loaded
#[derive(Clone)]
pub struct Artifacts {
    pub schema: FeatureSchema,
    pub scaler: Scaler,
    pub classifier: Arc<dyn Classifier>,
    pub amount_q95: AmountCutoff,
}

/// Loader for training artifacts
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new(onnx_threads: usize) -> Self {
        Self { onnx_threads }
    }

    /// Load and cross-check all artifacts.
    ///
    /// Any error is fatal; only the AmountQ95 artifact may be absent.
    pub fn load_all(&self, config: &ArtifactsConfig) -> Result<Artifacts, ArtifactError> {
        let schema = load_schema(&config.feature_names)?;
        info!(
            features = schema.len(),
            path = %config.feature_names.display(),
            "Feature schema loaded"
        );

        let scaler = load_scaler(&config.scaler)?;
        scaler.validate(&schema)?;
        info!(kind = scaler.kind_name(), path = %config.scaler.display(), "Scaler loaded");

        let classifier = self.load_classifier(&config.classifier, &schema)?;

        let amount_q95 = load_amount_q95(&config.amount_q95);

        Ok(Artifacts {
            schema,
            scaler,
            classifier,
            amount_q95,
        })
    }

    /// Load the classifier, dispatching on file extension
    pub fn load_classifier(&self, path: &Path, schema: &FeatureSchema) -> Result<Arc<dyn Classifier>, ArtifactError> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string();

        match path.extension().and_then(|e| e.to_str()) {
            Some("onnx") => {
                let model = OnnxClassifier::load(path, &name, self.onnx_threads)?;
                Ok(Arc::new(model))
            }
            Some("json") => {
                let json = read(path)?;
                let model = LogisticClassifier::from_json(&name, &json).map_err(|source| ArtifactError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;

                if model.dimension() != schema.len() {
                    return Err(ArtifactError::DimensionMismatch {
                        artifact: "classifier",
                        expected: schema.len(),
                        found: model.dimension(),
                    });
                }

                info!(model = %name, path = %path.display(), "Logistic model loaded");
                Ok(Arc::new(model))
            }
            _ => Err(ArtifactError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

fn read(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let json = read(path)?;
    serde_json::from_str(&json).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Ordered feature names (JSON array of strings)
pub fn load_schema(path: &Path) -> Result<FeatureSchema, ArtifactError> {
    FeatureSchema::new(parse(path)?)
}

pub fn load_scaler(path: &Path) -> Result<Scaler, ArtifactError> {
    parse(path)
}

/// Read the 95th percentile amount, falling back to [`DEFAULT_AMOUNT_Q95`]
pub fn load_amount_q95(path: &Path) -> AmountCutoff {
    match parse::<f64>(path) {
        Ok(value) if value.is_finite() => {
            info!(amount_q95 = value, "Large-transaction cutoff loaded");
            AmountCutoff {
                value,
                fallback: false,
            }
        }
        Ok(value) => {
            warn!(value, fallback = DEFAULT_AMOUNT_Q95, "AmountQ95 is not finite, using fallback");
            AmountCutoff {
                value: DEFAULT_AMOUNT_Q95,
                fallback: true,
            }
        }
        Err(e) => {
            warn!(error = %e, fallback = DEFAULT_AMOUNT_Q95, "AmountQ95 unavailable, using fallback");
            AmountCutoff {
                value: DEFAULT_AMOUNT_Q95,
                fallback: true,
            }
        }
    }
}
