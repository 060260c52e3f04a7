//! Binary classifiers producing a fraud (class 1) probability

use crate::error::{ArtifactError, ScoringError};
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Pre-trained classifier consumed read-only by the scorer
pub trait Classifier: Send + Sync {
    /// Model name reported by the health probe
    fn name(&self) -> &str;

    /// Probability of the positive (fraud) class for one scaled row
    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError>;
}

/// Logistic regression exported as JSON coefficients
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LogisticClassifier {
    #[serde(skip)]
    name: String,
    pub coef: Vec<f64>,
    pub intercept: f64,
}

/// On-disk layout: `{"kind": "logistic", "coef": [...], "intercept": ...}`
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum JsonModel {
    Logistic(LogisticClassifier),
}

impl LogisticClassifier {
    pub fn new(name: &str, coef: Vec<f64>, intercept: f64) -> Self {
        Self {
            name: name.to_string(),
            coef,
            intercept,
        }
    }

    /// Parse a JSON model artifact
    pub fn from_json(name: &str, json: &str) -> Result<Self, serde_json::Error> {
        let JsonModel::Logistic(mut model) = serde_json::from_str(json)?;
        model.name = name.to_string();
        Ok(model)
    }

    pub fn dimension(&self) -> usize {
        self.coef.len()
    }
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError> {
        if features.len() != self.coef.len() {
            return Err(ScoringError::DimensionMismatch {
                expected: self.coef.len(),
                found: features.len(),
            });
        }

        let z: f64 = self
            .coef
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum::<f64>()
            + self.intercept;

        Ok(1.0 / (1.0 + (-z).exp()))
    }
}

/// ONNX classifier (skl2onnx / onnxmltools export) run through ONNX Runtime
pub struct OnnxClassifier {
    name: String,
    /// `Session::run` needs exclusive access
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxClassifier {
    /// Load a model file with the given number of intra-op threads
    pub fn load<P: AsRef<Path>>(path: P, name: &str, onnx_threads: usize) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        ort::init().commit().map_err(|e| onnx_error(path, e))?;

        info!(model = %name, path = %path.display(), threads = onnx_threads, "Loading ONNX model");

        let session = Session::builder()
            .map_err(|e| onnx_error(path, e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| onnx_error(path, e))?
            .with_intra_threads(onnx_threads)
            .map_err(|e| onnx_error(path, e))?
            .commit_from_file(path)
            .map_err(|e| onnx_error(path, e))?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        // Prefer the probability output over the label output
        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.iter().find(|o| !o.name.contains("label")))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(Self {
            name: name.to_string(),
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }

    fn extract_probability(&self, outputs: &SessionOutputs) -> Result<f64, ScoringError> {
        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ScoringError::Inference(format!("model has no output `{}`", self.output_name)))?;

        // Tensor format (zipmap disabled)
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            let prob = fraud_prob_from_tensor(&dims, data)?;
            debug!(model = %self.name, prob = prob, "Extracted from tensor");
            return Ok(prob);
        }

        // seq(map(int64, float)) format (zipmap enabled)
        let dtype = output.dtype();
        if DynSequenceValueType::can_downcast(&dtype) {
            return self.extract_from_sequence_map(output);
        }

        Err(ScoringError::Inference(format!(
            "unsupported output type for `{}`",
            self.output_name
        )))
    }

    fn extract_from_sequence_map(&self, output: &DynValue) -> Result<f64, ScoringError> {
        let allocator = Allocator::default();

        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| ScoringError::Inference(e.to_string()))?;
        let maps = sequence
            .try_extract_sequence::<DynMapValueType>(&allocator)
            .map_err(|e| ScoringError::Inference(e.to_string()))?;

        // Batch size is always 1
        let map_value = maps
            .first()
            .ok_or_else(|| ScoringError::Inference("empty probability sequence".to_string()))?;
        let kv_pairs = map_value
            .try_extract_key_values::<i64, f32>()
            .map_err(|e| ScoringError::Inference(e.to_string()))?;

        kv_pairs
            .iter()
            .find(|(class_id, _)| *class_id == 1)
            .map(|(_, prob)| f64::from(*prob))
            .ok_or_else(|| ScoringError::Inference("no class 1 probability in output map".to_string()))
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict_proba(&self, features: &[f64]) -> Result<f64, ScoringError> {
        // Shape [1, num_features]; exported models take float32 input
        let shape = vec![1_i64, features.len() as i64];
        let data: Vec<f32> = features.iter().map(|&v| v as f32).collect();
        let input_tensor = Tensor::from_array((shape, data))
            .map_err(|e| ScoringError::Inference(format!("failed to create input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ScoringError::Inference(format!("session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| ScoringError::Inference(e.to_string()))?;

        self.extract_probability(&outputs)
    }
}

fn onnx_error(path: &Path, e: impl std::fmt::Display) -> ArtifactError {
    ArtifactError::Onnx {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Class-1 probability from a `[batch, classes]` or `[classes]` tensor
fn fraud_prob_from_tensor(dims: &[i64], data: &[f32]) -> Result<f64, ScoringError> {
    let classes = dims.last().copied().unwrap_or(0);
    let prob = match (dims.len(), classes) {
        (1 | 2, c) if c >= 2 => data.get(1),
        // Single column already holds the positive class probability
        (1 | 2, 1) => data.first(),
        _ => None,
    };

    prob.map(|&p| f64::from(p))
        .ok_or_else(|| ScoringError::Inference(format!("unexpected probability tensor shape {dims:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logistic_probability() {
        let model = LogisticClassifier::new("lr", vec![1.0, -1.0], 0.0);
        assert_eq!(model.predict_proba(&[2.0, 2.0]).unwrap(), 0.5);

        let high = model.predict_proba(&[5.0, 0.0]).unwrap();
        assert!(high > 0.99 && high < 1.0);
    }

    #[test]
    fn test_logistic_from_json() {
        let model =
            LogisticClassifier::from_json("fraud_lr", r#"{"kind": "logistic", "coef": [0.5, 0.25], "intercept": -1.0}"#)
                .unwrap();
        assert_eq!(model.name(), "fraud_lr");
        assert_eq!(model.dimension(), 2);
        assert_eq!(model.intercept, -1.0);
    }

    #[test]
    fn test_logistic_rejects_wrong_dimension() {
        let model = LogisticClassifier::new("lr", vec![1.0; 3], 0.0);
        assert!(matches!(
            model.predict_proba(&[1.0]),
            Err(ScoringError::DimensionMismatch { expected: 3, found: 1 })
        ));
    }

    #[test]
    fn test_tensor_probability_layouts() {
        assert_eq!(fraud_prob_from_tensor(&[1, 2], &[0.25, 0.75]).unwrap(), 0.75);
        assert_eq!(fraud_prob_from_tensor(&[2], &[0.5, 0.5]).unwrap(), 0.5);
        assert_eq!(fraud_prob_from_tensor(&[1, 1], &[0.125]).unwrap(), 0.125);
        assert!(fraud_prob_from_tensor(&[1, 2, 2], &[0.0; 4]).is_err());
        assert!(fraud_prob_from_tensor(&[1, 2], &[0.5]).is_err());
    }
}
