//! RBF (Radial Basis Function) kernel implementation
//!
//! The RBF kernel is defined as: K(x, y) = exp(-γ * ||x - y||²)
//! Mixed-data configurations use the unit width γ = 1 on their continuous
//! feature group.

use crate::core::Result;
use crate::kernel::traits::ensure_same_len;
use crate::kernel::VectorKernel;

/// RBF (Radial Basis Function) kernel: K(x, y) = exp(-γ * ||x - y||²)
///
/// Output lies in (0, 1] and K(x, x) = 1.
#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    /// Create a new RBF kernel with specified gamma parameter
    ///
    /// # Panics
    /// Panics if gamma is not positive
    pub fn new(gamma: f64) -> Self {
        assert!(gamma > 0.0, "Gamma must be positive, got: {}", gamma);
        Self { gamma }
    }

    /// Create RBF kernel with gamma = 1.0 (σ = 1)
    pub fn unit_gamma() -> Self {
        Self::new(1.0)
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Default for RBFKernel {
    /// Default RBF kernel with gamma = 1.0
    fn default() -> Self {
        Self::unit_gamma()
    }
}

impl VectorKernel for RBFKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        ensure_same_len(x, y)?;
        let squared_distance = squared_euclidean_distance(x, y);
        Ok((-self.gamma * squared_distance).exp())
    }
}

/// ||x - y||² = Σᵢ (xᵢ - yᵢ)²
pub(crate) fn squared_euclidean_distance(x: &[f64], y: &[f64]) -> f64 {
    x.iter()
        .zip(y)
        .map(|(a, b)| {
            let diff = a - b;
            diff * diff
        })
        .sum()
}
