//! Kernel trait definitions

use crate::core::{Record, Result};

/// Record-level kernel function
///
/// A kernel K(x, y) must be symmetric and satisfy Mercer's condition to be
/// usable by the SVM solver. Evaluation fails instead of guessing when the
/// records do not fit the kernel's configuration.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &Record, y: &Record) -> Result<f64>;
}

/// Kernel over equal-length numeric slices (one feature group)
pub trait VectorKernel: Send + Sync {
    /// Compute kernel value K(x, y); fails on a length mismatch
    fn compute(&self, x: &[f64], y: &[f64]) -> Result<f64>;
}

/// Check that two slices have the same length
pub(crate) fn ensure_same_len(x: &[f64], y: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(crate::core::SVMError::DimensionMismatch {
            expected: x.len(),
            actual: y.len(),
        });
    }
    Ok(())
}
