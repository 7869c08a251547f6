//! Univariate kernel for multi-category features
//!
//! For one categorical feature Z with probabilities P_Z:
//!
//! ```text
//! k(x, y) = (1 - P_Z(x)^α)^(1/α)   if x == y
//! k(x, y) = 0                      otherwise
//! ```
//!
//! Matching on a rare category counts for more than matching on a common
//! one.

use crate::config::{FrequencyTable, UnseenCategoryPolicy};
use crate::core::{Result, SVMError};

#[derive(Debug, Clone, Copy)]
pub struct UnivariateKernel {
    alpha: f64,
}

impl UnivariateKernel {
    /// # Panics
    /// Panics if alpha is not positive
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0, "Alpha must be positive, got: {}", alpha);
        Self { alpha }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Similarity of two category codes of feature `feature`
    ///
    /// Fails with `MissingParameter` when no table is supplied for the
    /// feature, whatever the codes.
    pub fn compute(
        &self,
        feature: usize,
        x: u32,
        y: u32,
        table: Option<&FrequencyTable>,
        policy: UnseenCategoryPolicy,
    ) -> Result<f64> {
        let table = table.ok_or_else(|| {
            SVMError::MissingParameter(format!(
                "No category probabilities for univariate feature {feature}"
            ))
        })?;

        if x != y {
            return Ok(0.0);
        }

        let p = table.resolve(feature, x, policy)?;
        Ok(self.self_similarity(p))
    }

    /// (1 - p^α)^(1/α)
    pub fn self_similarity(&self, p: f64) -> f64 {
        if self.alpha == 1.0 {
            return 1.0 - p;
        }
        (1.0 - p.powf(self.alpha)).max(0.0).powf(1.0 / self.alpha)
    }
}

impl Default for UnivariateKernel {
    /// α = 1
    fn default() -> Self {
        Self::new(1.0)
    }
}
