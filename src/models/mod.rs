//! Model artifacts and inference components

pub mod classifier;
pub mod inference;
pub mod loader;
pub mod scaler;
pub mod schema;

pub use classifier::{Classifier, LogisticClassifier, OnnxClassifier};
pub use inference::{InferenceEngine, DECISION_THRESHOLD};
pub use loader::{AmountCutoff, Artifacts, ModelLoader};
pub use scaler::Scaler;
pub use schema::{FeatureSchema, FeatureVector, MissingFeatureFill};
