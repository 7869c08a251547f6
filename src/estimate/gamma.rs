//! Gamma estimation from the spread of pairwise feature-space distances
//!
//! The induced squared distance between two records is
//! 2·(1 - k(x, y)). Gamma is the mean of the distances found at the
//! lower and upper quartile rank positions of all n(n-1)/2 pairs.

use crate::core::{Record, Result, SVMError};
use crate::kernel::Kernel;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Estimated gamma and the order statistics it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaEstimate {
    pub gamma: f64,
    /// Distance at the lower rank position
    pub lower: f64,
    /// Distance at the upper rank position
    pub upper: f64,
    pub n_pairs: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct GammaEstimator {
    lower_quantile: f64,
    upper_quantile: f64,
}

impl GammaEstimator {
    pub fn new() -> Self {
        Self {
            lower_quantile: 0.25,
            upper_quantile: 0.75,
        }
    }

    /// Use other rank positions; both must lie in [0, 1] with lower <= upper
    pub fn with_quantiles(mut self, lower: f64, upper: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&lower) || !(0.0..=1.0).contains(&upper) || lower > upper {
            return Err(SVMError::InvalidParameter(format!(
                "Quantiles must satisfy 0 <= lower <= upper <= 1, got: {lower}, {upper}"
            )));
        }
        self.lower_quantile = lower;
        self.upper_quantile = upper;
        Ok(self)
    }

    /// Estimate gamma for `records` under the (unreshaped) kernel
    pub fn estimate<K: Kernel + ?Sized>(&self, kernel: &K, records: &[Record]) -> Result<GammaEstimate> {
        if records.len() < 2 {
            return Err(SVMError::InvalidDataset(format!(
                "Gamma estimation needs at least 2 records, got {}",
                records.len()
            )));
        }

        let distances = pairwise_distances(kernel, records)?;
        let lower = rank_value(&distances, self.lower_quantile);
        let upper = rank_value(&distances, self.upper_quantile);
        let gamma = (lower + upper) / 2.0;

        debug!(
            "{} pairwise distances, rank values {:.6} and {:.6}",
            distances.len(),
            lower,
            upper
        );

        if !(gamma > 0.0 && gamma.is_finite()) {
            return Err(SVMError::InvalidDataset(format!(
                "Estimated gamma {gamma} is not positive; records are indistinguishable under the kernel"
            )));
        }

        info!("Estimated gamma = {:.6}", gamma);
        Ok(GammaEstimate {
            gamma,
            lower,
            upper,
            n_pairs: distances.len(),
        })
    }
}

impl Default for GammaEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// 2·(1 - k(xᵢ, xⱼ)) for every pair i < j, sorted ascending
///
/// Each row i yields its own partial vector; the parts are merged after
/// the parallel sweep.
pub fn pairwise_distances<K: Kernel + ?Sized>(kernel: &K, records: &[Record]) -> Result<Vec<f64>> {
    let n = records.len();
    let rows = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| {
                    kernel
                        .compute(&records[i], &records[j])
                        .map(|k| 2.0 * (1.0 - k))
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let mut distances: Vec<f64> = rows.into_iter().flatten().collect();
    distances.sort_by(f64::total_cmp);
    Ok(distances)
}

/// Order statistic at 1-based rank round(q·m), clamped to [1, m]
///
/// Halves round to the even rank, so q·m = 4.5 picks rank 4.
/// `sorted` must be non-empty and ascending.
pub fn rank_value(sorted: &[f64], q: f64) -> f64 {
    let m = sorted.len();
    let rank = ((q * m as f64).round_ties_even() as usize).clamp(1, m);
    sorted[rank - 1]
}
