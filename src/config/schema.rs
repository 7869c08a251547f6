//! Training schema: per-feature type tags in column order

use crate::core::{FeatureValue, Record, Result, SVMError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Type tag of a feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Continuous,
    Categorical,
}

/// Named feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FeatureType,
}

impl FeatureSpec {
    pub fn new(name: impl Into<String>, kind: FeatureType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered list of feature columns
///
/// Stored as JSON:
///
/// ```json
/// {"features": [{"name": "pulse", "type": "continuous"},
///               {"name": "surgery", "type": "categorical"}]}
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub features: Vec<FeatureSpec>,
}

impl FeatureSchema {
    pub fn new(features: Vec<FeatureSpec>) -> Self {
        Self { features }
    }

    /// Schema with generated names `f0`, `f1`, ...
    pub fn from_types(types: &[FeatureType]) -> Self {
        Self::new(
            types
                .iter()
                .enumerate()
                .map(|(i, &kind)| FeatureSpec::new(format!("f{i}"), kind))
                .collect(),
        )
    }

    /// Parse a schema from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self = serde_json::from_str(json)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        schema.ensure_not_empty()?;
        Ok(schema)
    }

    /// Load a schema from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let schema: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        schema.ensure_not_empty()?;
        Ok(schema)
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.features.is_empty() {
            return Err(SVMError::InvalidParameter(
                "Schema must declare at least one feature".to_string(),
            ));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Type tag of a feature
    pub fn kind(&self, index: usize) -> Option<FeatureType> {
        self.features.get(index).map(|f| f.kind)
    }

    /// Check that a record has one value of the declared type per column
    pub fn check_record(&self, record: &Record) -> Result<()> {
        if record.len() != self.len() {
            return Err(SVMError::DimensionMismatch {
                expected: self.len(),
                actual: record.len(),
            });
        }

        for (index, (spec, value)) in self.features.iter().zip(record.values()).enumerate() {
            match (spec.kind, value) {
                (FeatureType::Continuous, FeatureValue::Numeric(v)) if !v.is_finite() => {
                    return Err(SVMError::InvalidFeature {
                        index,
                        reason: format!("non-finite value {v}"),
                    });
                }
                (FeatureType::Continuous, FeatureValue::Numeric(_)) => {}
                (FeatureType::Categorical, FeatureValue::Categorical(0)) => {
                    return Err(SVMError::InvalidFeature {
                        index,
                        reason: "category codes start at 1".to_string(),
                    });
                }
                (FeatureType::Categorical, FeatureValue::Categorical(_)) => {}
                (FeatureType::Continuous, FeatureValue::Categorical(_)) => {
                    return Err(SVMError::InvalidFeature {
                        index,
                        reason: format!("'{}' is continuous, got a category", spec.name),
                    });
                }
                (FeatureType::Categorical, FeatureValue::Numeric(_)) => {
                    return Err(SVMError::InvalidFeature {
                        index,
                        reason: format!("'{}' is categorical, got a number", spec.name),
                    });
                }
            }
        }

        Ok(())
    }
}
