//! Aggregate kernel: exponential reshaping of the inner kernel
//!
//! K(x, y) = (exp(γ·k(x, y)) - 1) / (exp(γ) - 1)
//!
//! The map is strictly increasing in k and fixes 0 and 1. Large γ sharpens
//! the similarity curve, γ → 0 flattens it to the identity.

use crate::core::{Record, Result, SVMError};
use crate::kernel::{GramMatrix, InnerKernel, Kernel, PrecomputedKernel};
use std::sync::Arc;

/// Below this γ the reshape is the identity map
pub const GAMMA_EPSILON: f64 = 1e-10;

/// (exp(γk) - 1) / (exp(γ) - 1), without 0/0 near γ = 0 or overflow for
/// large γ
pub fn exponential_reshape(gamma: f64, k: f64) -> f64 {
    if gamma < GAMMA_EPSILON {
        return k;
    }
    // Same ratio as exp(γ(k-1)) · (1 - exp(-γk)) / (1 - exp(-γ))
    (gamma * (k - 1.0)).exp() * (-gamma * k).exp_m1() / (-gamma).exp_m1()
}

/// Inner kernel followed by the exponential reshape
#[derive(Debug, Clone)]
pub struct AggregateKernel {
    inner: InnerKernel,
    gamma: f64,
}

impl AggregateKernel {
    /// Create an aggregate kernel; gamma must be positive and finite
    pub fn new(inner: InnerKernel, gamma: f64) -> Result<Self> {
        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "Gamma must be positive and finite, got: {gamma}"
            )));
        }
        Ok(Self { inner, gamma })
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn inner(&self) -> &InnerKernel {
        &self.inner
    }

    /// Reshape an inner-kernel value with this kernel's gamma
    pub fn reshape(&self, k: f64) -> f64 {
        exponential_reshape(self.gamma, k)
    }

    /// Full training Gram matrix
    pub fn gram(&self, records: &[Record]) -> Result<GramMatrix> {
        GramMatrix::compute(self, records)
    }

    /// Gram matrix wrapped for index lookups
    pub fn precompute(&self, records: &[Record]) -> Result<PrecomputedKernel> {
        Ok(PrecomputedKernel::new(Arc::new(self.gram(records)?)))
    }
}

impl Kernel for AggregateKernel {
    fn compute(&self, x: &Record, y: &Record) -> Result<f64> {
        let k = self.inner.compute(x, y)?;
        Ok(self.reshape(k))
    }
}
