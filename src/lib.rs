//! Support Vector Machines for mixed continuous and categorical data
//!
//! Records are compared with an aggregate kernel: RBF, linear, Jaccard and
//! univariate sub-kernels are averaged into an inner kernel `k`, which is
//! reshaped as `(exp(gamma * k) - 1) / (exp(gamma) - 1)`. Gamma is
//! estimated from quantiles of the pairwise kernel distances and C by
//! k-fold cross-validation.

pub mod api;
pub mod cache;
pub mod config;
pub mod core;
pub mod data;
pub mod estimate;
pub mod kernel;
pub mod optimizer;
pub mod persistence;
pub mod solver;

// Re-export main types for convenience
pub use crate::api::{
    EvaluationMetrics, FittedModel, HyperParameters, MixedKernelSVM, ModelInfo,
};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::config::{
    FeatureConfiguration, FeatureSchema, FeatureType, KernelFamily, UnseenCategoryPolicy,
};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{Result, SVMError};
pub use crate::data::MixedCSVDataset;
pub use crate::estimate::{CEstimator, GammaEstimator};
pub use crate::kernel::{AggregateKernel, GramMatrix, InnerKernel, Kernel};
pub use crate::optimizer::{SVMOptimizer, TrainedSVM};
pub use crate::persistence::SerializableModel;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
