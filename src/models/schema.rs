//! Training-time feature schema and feature vector assembly

use crate::error::ArtifactError;
use crate::feature_extractor::EngineeredFeatureRow;
use serde::Deserialize;
use std::collections::HashSet;

/// Value written into schema columns the engineered row does not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingFeatureFill {
    /// 0.0
    #[default]
    Zero,
    /// NaN, matching a pandas `reindex` of absent columns
    Nan,
}

impl MissingFeatureFill {
    pub fn value(self) -> f64 {
        match self {
            MissingFeatureFill::Zero => 0.0,
            MissingFeatureFill::Nan => f64::NAN,
        }
    }
}

/// Ordered list of feature names the scaler and classifier were fit on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty or duplicated name lists
    pub fn new(names: Vec<String>) -> Result<Self, ArtifactError> {
        if names.is_empty() {
            return Err(ArtifactError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(ArtifactError::DuplicateFeature(name.clone()));
            }
        }

        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Reorder an engineered row into schema order.
    ///
    /// Schema columns the row lacks are filled with `fill` and reported in
    /// [`AssembledFeatures::missing`]; row values outside the schema are dropped.
    pub fn assemble(&self, row: &EngineeredFeatureRow, fill: MissingFeatureFill) -> AssembledFeatures {
        let mut values = Vec::with_capacity(self.names.len());
        let mut missing = Vec::new();

        for name in &self.names {
            match row.get(name) {
                Some(value) => values.push(value),
                None => {
                    values.push(fill.value());
                    missing.push(name.clone());
                }
            }
        }

        let dropped = row
            .iter()
            .filter(|(name, _)| !self.names.iter().any(|n| n.as_str() == *name))
            .map(|(name, _)| name)
            .collect();

        AssembledFeatures {
            vector: FeatureVector(values),
            missing,
            dropped,
        }
    }
}

/// Engineered row in schema order, the only form the scaler accepts
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Assembly output with drift diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledFeatures {
    pub vector: FeatureVector,
    /// Schema columns filled with the default value
    pub missing: Vec<String>,
    /// Engineered values the schema does not use
    pub dropped: Vec<&'static str>,
}
