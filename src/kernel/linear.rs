//! Linear kernel implementation

use crate::core::Result;
use crate::kernel::traits::ensure_same_len;
use crate::kernel::VectorKernel;

/// Linear kernel: K(x, y) = x^T * y
///
/// Not used by configurations derived from a schema, but available to
/// hand-written ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl VectorKernel for LinearKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        ensure_same_len(x, y)?;
        Ok(dot_product(x, y))
    }
}

pub(crate) fn dot_product(x: &[f64], y: &[f64]) -> f64 {
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}
