//! Scorer: scaler transform, classifier probability and decision threshold

use crate::error::ScoringError;
use crate::models::classifier::Classifier;
use crate::models::scaler::Scaler;
use crate::models::schema::FeatureVector;
use crate::types::score::ScoreResult;
use std::sync::Arc;
use tracing::debug;

/// Probability at or above which a transaction is labelled fraud.
///
/// Chosen offline to balance precision and recall on the validation set.
pub const DECISION_THRESHOLD: f64 = 0.230;

/// Scores assembled feature vectors against the loaded scaler and classifier
pub struct InferenceEngine {
    scaler: Scaler,
    classifier: Arc<dyn Classifier>,
    threshold: f64,
}

impl InferenceEngine {
    pub fn new(scaler: Scaler, classifier: Arc<dyn Classifier>, threshold: f64) -> Self {
        Self {
            scaler,
            classifier,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model_name(&self) -> &str {
        self.classifier.name()
    }

    /// Scale, predict and apply the threshold
    pub fn score(&self, features: &FeatureVector) -> Result<ScoreResult, ScoringError> {
        let scaled = self.scaler.transform(features)?;
        let probability = self.classifier.predict_proba(&scaled)?;

        if !(0.0..=1.0).contains(&probability) {
            return Err(ScoringError::InvalidProbability(probability));
        }

        let result = ScoreResult::from_probability(probability, self.threshold);

        debug!(
            model = %self.classifier.name(),
            probability = probability,
            is_fraud = result.is_fraud,
            "Inference complete"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classifier::LogisticClassifier;

    /// Returns a fixed probability and records nothing
    struct FixedClassifier(f64);

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict_proba(&self, _features: &[f64]) -> Result<f64, ScoringError> {
            Ok(self.0)
        }
    }

    fn engine(probability: f64) -> InferenceEngine {
        InferenceEngine::new(
            Scaler::standard(vec![0.0], vec![1.0]),
            Arc::new(FixedClassifier(probability)),
            DECISION_THRESHOLD,
        )
    }

    #[test]
    fn test_threshold_boundary() {
        let features = FeatureVector::new(vec![1.0]);

        let at = engine(0.230).score(&features).unwrap();
        assert_eq!(at.is_fraud, 1);
        assert_eq!(at.threshold, 0.230);

        let below = engine(0.2299999).score(&features).unwrap();
        assert_eq!(below.is_fraud, 0);
        assert!(below.engineered_features_used);
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let features = FeatureVector::new(vec![1.0]);
        assert!(matches!(
            engine(f64::NAN).score(&features),
            Err(ScoringError::InvalidProbability(_))
        ));
        assert!(matches!(
            engine(1.5).score(&features),
            Err(ScoringError::InvalidProbability(_))
        ));
    }

    #[test]
    fn test_scaler_applied_before_classifier() {
        // sigmoid((x - 10) / 2) with x = 10 gives exactly 0.5
        let engine = InferenceEngine::new(
            Scaler::standard(vec![10.0], vec![2.0]),
            Arc::new(LogisticClassifier::new("lr", vec![1.0], 0.0)),
            DECISION_THRESHOLD,
        );

        let result = engine.score(&FeatureVector::new(vec![10.0])).unwrap();
        assert_eq!(result.fraud_probability, 0.5);
        assert_eq!(engine.model_name(), "lr");
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let engine = InferenceEngine::new(
            Scaler::standard(vec![1.0, 2.0], vec![3.0, 4.0]),
            Arc::new(LogisticClassifier::new("lr", vec![0.3, -0.7], 0.1)),
            DECISION_THRESHOLD,
        );
        let features = FeatureVector::new(vec![123.4, 56.7]);

        let first = engine.score(&features).unwrap();
        let second = engine.score(&features).unwrap();
        assert_eq!(first.fraud_probability.to_bits(), second.fraud_probability.to_bits());
    }
}
