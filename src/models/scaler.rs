//! Pre-fit numeric scaler exported from training

use crate::error::{ArtifactError, ScoringError};
use crate::models::schema::{FeatureSchema, FeatureVector};
use serde::Deserialize;

/// Fitted parameters, tagged by `kind` in the artifact JSON.
///
/// Parameter names follow the scikit-learn attributes they were exported from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerKind {
    /// `StandardScaler`: `(x - mean) / scale`
    Standard {
        mean: Option<Vec<f64>>,
        scale: Option<Vec<f64>>,
    },
    /// `MinMaxScaler`: `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
    /// `RobustScaler`: `(x - center) / scale`
    Robust {
        center: Option<Vec<f64>>,
        scale: Option<Vec<f64>>,
    },
}

/// Scaler artifact
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scaler {
    #[serde(flatten)]
    pub kind: ScalerKind,
    /// `feature_names_in_`, when the scaler was fit on a named frame
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
}

impl Scaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            kind: ScalerKind::Standard {
                mean: Some(mean),
                scale: Some(scale),
            },
            feature_names: None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ScalerKind::Standard { .. } => "standard",
            ScalerKind::MinMax { .. } => "min_max",
            ScalerKind::Robust { .. } => "robust",
        }
    }

    /// Parameter arrays present in the artifact
    fn parameters(&self) -> Vec<&[f64]> {
        let arrays: [Option<&Vec<f64>>; 2] = match &self.kind {
            ScalerKind::Standard { mean, scale } => [mean.as_ref(), scale.as_ref()],
            ScalerKind::MinMax { min, scale } => [Some(min), Some(scale)],
            ScalerKind::Robust { center, scale } => [center.as_ref(), scale.as_ref()],
        };
        arrays.into_iter().flatten().map(Vec::as_slice).collect()
    }

    /// Check the scaler was fit on the same columns as the schema
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), ArtifactError> {
        for params in self.parameters() {
            if params.len() != schema.len() {
                return Err(ArtifactError::DimensionMismatch {
                    artifact: "scaler",
                    expected: schema.len(),
                    found: params.len(),
                });
            }
        }

        if let Some(names) = &self.feature_names {
            if names.as_slice() != schema.names() {
                return Err(ArtifactError::SchemaMismatch);
            }
        }

        Ok(())
    }

    /// Apply the fitted transform
    pub fn transform(&self, features: &FeatureVector) -> Result<Vec<f64>, ScoringError> {
        let x = features.as_slice();
        for params in self.parameters() {
            if params.len() != x.len() {
                return Err(ScoringError::DimensionMismatch {
                    expected: params.len(),
                    found: x.len(),
                });
            }
        }

        let scaled = match &self.kind {
            ScalerKind::Standard { mean, scale } | ScalerKind::Robust { center: mean, scale } => x
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    let shifted = mean.as_ref().map_or(v, |m| v - m[i]);
                    scale.as_ref().map_or(shifted, |s| shifted / nonzero(s[i]))
                })
                .collect(),
            ScalerKind::MinMax { min, scale } => x
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(&v, (&m, &s))| v * s + m)
                .collect(),
        };

        Ok(scaled)
    }
}

/// Constant columns are exported with scale 0; training divided them by 1
fn nonzero(scale: f64) -> f64 {
    if scale == 0.0 {
        1.0
    } else {
        scale
    }
}
