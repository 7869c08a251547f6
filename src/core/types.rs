//! Core type definitions for mixed-data records and SVM results

use serde::{Deserialize, Serialize};

/// A single feature value: either continuous or a categorical code
///
/// Categorical codes are positive integers (1-based). The kernels never
/// assume an order between codes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureValue {
    Numeric(f64),
    Categorical(u32),
}

impl FeatureValue {
    /// Numeric payload, if this is a continuous value
    pub fn as_numeric(&self) -> Option<f64> {
        match *self {
            FeatureValue::Numeric(v) => Some(v),
            FeatureValue::Categorical(_) => None,
        }
    }

    /// Category code, if this is a categorical value
    pub fn as_category(&self) -> Option<u32> {
        match *self {
            FeatureValue::Categorical(c) => Some(c),
            FeatureValue::Numeric(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Numeric(value)
    }
}

impl From<u32> for FeatureValue {
    fn from(code: u32) -> Self {
        FeatureValue::Categorical(code)
    }
}

/// Ordered tuple of feature values, one slot per feature index
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    values: Vec<FeatureValue>,
}

impl Record {
    /// Create a record from its feature values
    pub fn new(values: Vec<FeatureValue>) -> Self {
        Self { values }
    }

    /// Record made only of continuous values
    pub fn numeric(values: &[f64]) -> Self {
        Self::new(values.iter().map(|&v| FeatureValue::Numeric(v)).collect())
    }

    /// Record made only of categorical codes
    pub fn categorical(codes: &[u32]) -> Self {
        Self::new(codes.iter().map(|&c| FeatureValue::Categorical(c)).collect())
    }

    /// Value at a feature index
    pub fn get(&self, index: usize) -> Option<FeatureValue> {
        self.values.get(index).copied()
    }

    /// All feature values in index order
    pub fn values(&self) -> &[FeatureValue] {
        &self.values
    }

    /// Number of feature slots
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record has no features
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<FeatureValue>> for Record {
    fn from(values: Vec<FeatureValue>) -> Self {
        Self::new(values)
    }
}

/// Training sample with a record and a discrete outcome label
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Feature values
    pub record: Record,
    /// Class code of the outcome
    pub label: f64,
}

impl Sample {
    /// Create a new sample
    pub fn new(record: Record, label: f64) -> Self {
        Self { record, label }
    }
}

/// Prediction result containing label and decision value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class label
    pub label: f64,
    /// Raw decision value for two-class models, winning vote share otherwise
    pub decision_value: f64,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: f64, decision_value: f64) -> Self {
        Self {
            label,
            decision_value,
        }
    }

    /// Get confidence as absolute value of decision value
    pub fn confidence(&self) -> f64 {
        self.decision_value.abs()
    }
}

/// Result of a binary optimization run
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Bias term (b) of f(x) = Σ αᵢyᵢK(xᵢ,x) + b
    pub b: f64,
    /// Indices of support vectors (where alpha > 0)
    pub support_vectors: Vec<usize>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
}

/// Configuration for the SVM solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance of the KKT stopping criterion
    pub epsilon: f64,
    /// Maximum number of working-set iterations
    pub max_iterations: usize,
    /// Kernel cache size in bytes (on-the-fly evaluation only)
    pub cache_size: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            epsilon: 0.001,
            max_iterations: 100_000,
            cache_size: 100_000_000, // 100MB
        }
    }
}
