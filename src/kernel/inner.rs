//! Inner kernel: unweighted mean of the sub-kernels over a configuration
//!
//! Every RBF, linear or Jaccard group contributes one comparison; every
//! feature of a univariate group contributes one comparison of its own.
//! The result is the sum of all comparisons divided by their count, so a
//! wide categorical block is not diluted against a single continuous
//! group.

use crate::config::{FeatureConfiguration, KernelFamily};
use crate::core::{FeatureValue, Record, Result, SVMError};
use crate::kernel::{
    JaccardKernel, Kernel, LinearKernel, RBFKernel, UnivariateKernel, VectorKernel,
};
use std::sync::Arc;

/// Mixed-data kernel over a frozen feature configuration
#[derive(Debug, Clone)]
pub struct InnerKernel {
    config: Arc<FeatureConfiguration>,
    rbf: RBFKernel,
    linear: LinearKernel,
    jaccard: JaccardKernel,
    univariate: UnivariateKernel,
}

impl InnerKernel {
    /// Unit-width RBF and α = 1 univariate sub-kernels
    pub fn new(config: Arc<FeatureConfiguration>) -> Self {
        Self {
            config,
            rbf: RBFKernel::unit_gamma(),
            linear: LinearKernel::new(),
            jaccard: JaccardKernel::new(),
            univariate: UnivariateKernel::default(),
        }
    }

    pub fn config(&self) -> &FeatureConfiguration {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<FeatureConfiguration> {
        Arc::clone(&self.config)
    }

    fn check_domain(&self, x: &Record, y: &Record) -> Result<()> {
        if x.len() != y.len() {
            return Err(SVMError::DimensionMismatch {
                expected: x.len(),
                actual: y.len(),
            });
        }
        if x.len() != self.config.n_features() {
            return Err(SVMError::DimensionMismatch {
                expected: self.config.n_features(),
                actual: x.len(),
            });
        }
        Ok(())
    }

    fn value(record: &Record, index: usize) -> Result<FeatureValue> {
        record.get(index).ok_or(SVMError::DimensionMismatch {
            expected: index + 1,
            actual: record.len(),
        })
    }

    fn numeric_slice(record: &Record, features: &[usize]) -> Result<Vec<f64>> {
        features
            .iter()
            .map(|&index| {
                Self::value(record, index)?
                    .as_numeric()
                    .ok_or_else(|| SVMError::InvalidFeature {
                        index,
                        reason: "numeric value expected".to_string(),
                    })
            })
            .collect()
    }

    /// Code a Jaccard group as 0/1: numbers must already be 0 or 1,
    /// categories are 1 on the configured positive level
    fn binary_slice(&self, record: &Record, features: &[usize]) -> Result<Vec<f64>> {
        features
            .iter()
            .map(|&index| match Self::value(record, index)? {
                FeatureValue::Numeric(v) if v == 0.0 || v == 1.0 => Ok(v),
                FeatureValue::Numeric(v) => Err(SVMError::InvalidFeature {
                    index,
                    reason: format!("binary value expected, got {v}"),
                }),
                FeatureValue::Categorical(code) => {
                    let positive = self.config.positive_level(index).ok_or_else(|| {
                        SVMError::MissingParameter(format!(
                            "No positive level for binary feature {index}"
                        ))
                    })?;
                    Ok(if code == positive { 1.0 } else { 0.0 })
                }
            })
            .collect()
    }

    fn category(record: &Record, index: usize) -> Result<u32> {
        Self::value(record, index)?
            .as_category()
            .ok_or_else(|| SVMError::InvalidFeature {
                index,
                reason: "category code expected".to_string(),
            })
    }
}

impl Kernel for InnerKernel {
    fn compute(&self, x: &Record, y: &Record) -> Result<f64> {
        self.check_domain(x, y)?;

        let mut sum = 0.0;
        let mut comparisons = 0usize;

        for group in self.config.groups() {
            match group.family {
                KernelFamily::Rbf => {
                    let a = Self::numeric_slice(x, &group.features)?;
                    let b = Self::numeric_slice(y, &group.features)?;
                    sum += self.rbf.compute(&a, &b)?;
                    comparisons += 1;
                }
                KernelFamily::Linear => {
                    let a = Self::numeric_slice(x, &group.features)?;
                    let b = Self::numeric_slice(y, &group.features)?;
                    sum += self.linear.compute(&a, &b)?;
                    comparisons += 1;
                }
                KernelFamily::Jaccard => {
                    let a = self.binary_slice(x, &group.features)?;
                    let b = self.binary_slice(y, &group.features)?;
                    sum += self.jaccard.compute(&a, &b)?;
                    comparisons += 1;
                }
                KernelFamily::Univariate => {
                    for &index in &group.features {
                        sum += self.univariate.compute(
                            index,
                            Self::category(x, index)?,
                            Self::category(y, index)?,
                            self.config.frequency_table(index),
                            self.config.unseen_policy(),
                        )?;
                        comparisons += 1;
                    }
                }
            }
        }

        if comparisons == 0 {
            return Err(SVMError::InvalidParameter(
                "Configuration has no feature groups".to_string(),
            ));
        }

        Ok(sum / comparisons as f64)
    }
}
