//! Jaccard kernel for binary (0/1-coded) feature vectors
//!
//! K(x, y) = n11 / (n11 + n10 + n01), where n11 counts positions where both
//! vectors are 1 and n10 / n01 count positions where exactly one is 1.
//! Positions where both are 0 are ignored.

use crate::core::{Result, SVMError};
use crate::kernel::traits::ensure_same_len;
use crate::kernel::VectorKernel;

/// Jaccard similarity kernel
///
/// Two all-zero vectors have an empty union; their similarity is 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardKernel;

impl JaccardKernel {
    pub fn new() -> Self {
        Self
    }
}

impl VectorKernel for JaccardKernel {
    fn compute(&self, x: &[f64], y: &[f64]) -> Result<f64> {
        ensure_same_len(x, y)?;

        let mut both = 0usize;
        let mut either = 0usize;
        for (position, (&a, &b)) in x.iter().zip(y).enumerate() {
            let a = is_set(position, a)?;
            let b = is_set(position, b)?;
            if a && b {
                both += 1;
            }
            if a || b {
                either += 1;
            }
        }

        if either == 0 {
            return Ok(0.0);
        }
        Ok(both as f64 / either as f64)
    }
}

fn is_set(position: usize, value: f64) -> Result<bool> {
    if value == 1.0 {
        Ok(true)
    } else if value == 0.0 {
        Ok(false)
    } else {
        Err(SVMError::InvalidFeature {
            index: position,
            reason: format!("binary value expected, got {value}"),
        })
    }
}
