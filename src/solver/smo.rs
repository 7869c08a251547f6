//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the binary C-SVC dual
//!
//! ```text
//! min  ½ αᵀQα - eᵀα    subject to  yᵀα = 0,  0 ≤ αᵢ ≤ C
//! ```
//!
//! with Qᵢⱼ = yᵢ yⱼ K(i, j). Each iteration picks the maximal violating
//! pair using second-order information and solves the two-variable
//! subproblem analytically. Kernel values come from any [`KernelMatrix`],
//! so the same solver runs on a precomputed Gram matrix, a fold subset of
//! one, or a lazily evaluated cache.

use crate::core::{OptimizationResult, OptimizerConfig, Result, SVMError};
use crate::kernel::KernelMatrix;
use log::{debug, warn};

/// Stand-in for a non-positive curvature along the working pair
const TAU: f64 = 1e-12;

/// SMO solver for SVM optimization
#[derive(Debug, Clone)]
pub struct SMOSolver {
    config: OptimizerConfig,
}

impl SMOSolver {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Solve the dual problem for labels in {-1, +1}
    ///
    /// The decision function of the result is
    /// f(x) = Σ αᵢ yᵢ K(xᵢ, x) + b.
    pub fn solve<M: KernelMatrix + ?Sized>(
        &self,
        kernel: &M,
        labels: &[f64],
    ) -> Result<OptimizationResult> {
        self.validate(kernel, labels)?;

        let n = labels.len();
        let first = labels[0];
        if labels.iter().all(|&y| y == first) {
            debug!("Single-class training set of {n} samples, constant decision {first}");
            return Ok(OptimizationResult {
                alpha: vec![0.0; n],
                b: first,
                support_vectors: Vec::new(),
                iterations: 0,
                objective_value: 0.0,
            });
        }

        let diagonal = (0..n)
            .map(|i| kernel.value(i, i))
            .collect::<Result<Vec<f64>>>()?;
        let mut state = SolverState {
            c: self.config.c,
            y: labels.to_vec(),
            alpha: vec![0.0; n],
            gradient: vec![-1.0; n],
            diagonal,
        };

        let mut iterations = 0;
        while iterations < self.config.max_iterations {
            let Some((i, j)) = state.select_working_set(kernel, self.config.epsilon)? else {
                break;
            };
            state.update_pair(kernel, i, j)?;
            iterations += 1;
        }

        if iterations >= self.config.max_iterations {
            warn!(
                "SMO reached max_iterations ({}) before converging",
                self.config.max_iterations
            );
        }

        let b = -state.rho();
        let support_vectors: Vec<usize> = (0..n).filter(|&i| state.alpha[i] > 0.0).collect();
        let objective_value = state.objective();

        debug!(
            "SMO finished after {} iterations: {} support vectors, b = {:.6}",
            iterations,
            support_vectors.len(),
            b
        );

        Ok(OptimizationResult {
            alpha: state.alpha,
            b,
            support_vectors,
            iterations,
            objective_value,
        })
    }

    fn validate<M: KernelMatrix + ?Sized>(&self, kernel: &M, labels: &[f64]) -> Result<()> {
        if !(self.config.c > 0.0 && self.config.c.is_finite()) {
            return Err(SVMError::InvalidParameter(format!(
                "C must be positive and finite, got: {}",
                self.config.c
            )));
        }
        if !(self.config.epsilon > 0.0) {
            return Err(SVMError::InvalidParameter(format!(
                "Epsilon must be positive, got: {}",
                self.config.epsilon
            )));
        }
        if labels.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if kernel.size() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: kernel.size(),
                actual: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&y| y != 1.0 && y != -1.0) {
            return Err(SVMError::InvalidLabel(bad));
        }
        Ok(())
    }
}

/// Mutable solver variables; the gradient is ∇f(α) = Qα - e
struct SolverState {
    c: f64,
    y: Vec<f64>,
    alpha: Vec<f64>,
    gradient: Vec<f64>,
    diagonal: Vec<f64>,
}

impl SolverState {
    fn is_upper_bound(&self, t: usize) -> bool {
        self.alpha[t] >= self.c
    }

    fn is_lower_bound(&self, t: usize) -> bool {
        self.alpha[t] <= 0.0
    }

    /// Maximal violating pair, or `None` once the duality gap is below eps
    fn select_working_set<M: KernelMatrix + ?Sized>(
        &self,
        kernel: &M,
        eps: f64,
    ) -> Result<Option<(usize, usize)>> {
        let n = self.y.len();
        let mut gmax = f64::NEG_INFINITY;
        let mut gmax_idx = None;

        for t in 0..n {
            let movable = if self.y[t] > 0.0 {
                !self.is_upper_bound(t)
            } else {
                !self.is_lower_bound(t)
            };
            let violation = -self.y[t] * self.gradient[t];
            if movable && violation >= gmax {
                gmax = violation;
                gmax_idx = Some(t);
            }
        }

        let Some(i) = gmax_idx else {
            return Ok(None);
        };
        let k_i = kernel.row(i)?;

        let mut gmax2 = f64::NEG_INFINITY;
        let mut best_j = None;
        let mut obj_diff_min = f64::INFINITY;

        for j in 0..n {
            let movable = if self.y[j] > 0.0 {
                !self.is_lower_bound(j)
            } else {
                !self.is_upper_bound(j)
            };
            if !movable {
                continue;
            }

            let violation = self.y[j] * self.gradient[j];
            if violation >= gmax2 {
                gmax2 = violation;
            }

            let grad_diff = gmax + violation;
            if grad_diff > 0.0 {
                let quad_coef = self.diagonal[i] + self.diagonal[j] - 2.0 * k_i[j];
                let curvature = if quad_coef > 0.0 { quad_coef } else { TAU };
                let obj_diff = -(grad_diff * grad_diff) / curvature;
                if obj_diff <= obj_diff_min {
                    obj_diff_min = obj_diff;
                    best_j = Some(j);
                }
            }
        }

        match best_j {
            Some(j) if gmax + gmax2 >= eps => Ok(Some((i, j))),
            _ => Ok(None),
        }
    }

    /// Analytic solution of the two-variable subproblem, clipped to the box
    fn update_pair<M: KernelMatrix + ?Sized>(
        &mut self,
        kernel: &M,
        i: usize,
        j: usize,
    ) -> Result<()> {
        let k_i = kernel.row(i)?;
        let k_j = kernel.row(j)?;
        let c = self.c;

        let old_i = self.alpha[i];
        let old_j = self.alpha[j];

        let mut quad_coef = self.diagonal[i] + self.diagonal[j] - 2.0 * k_i[j];
        if quad_coef <= 0.0 {
            quad_coef = TAU;
        }

        if self.y[i] != self.y[j] {
            let delta = (-self.gradient[i] - self.gradient[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }

            if diff > 0.0 {
                if self.alpha[i] > c {
                    self.alpha[i] = c;
                    self.alpha[j] = c - diff;
                }
            } else if self.alpha[j] > c {
                self.alpha[j] = c;
                self.alpha[i] = c + diff;
            }
        } else {
            let delta = (self.gradient[i] - self.gradient[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > c {
                if self.alpha[i] > c {
                    self.alpha[i] = c;
                    self.alpha[j] = sum - c;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }

            if sum > c {
                if self.alpha[j] > c {
                    self.alpha[j] = c;
                    self.alpha[i] = sum - c;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        let delta_i = (self.alpha[i] - old_i) * self.y[i];
        let delta_j = (self.alpha[j] - old_j) * self.y[j];
        for k in 0..self.y.len() {
            self.gradient[k] += self.y[k] * (k_i[k] * delta_i + k_j[k] * delta_j);
        }

        Ok(())
    }

    /// Threshold ρ with f(x) = Σ αᵢ yᵢ K(xᵢ, x) - ρ
    fn rho(&self) -> f64 {
        let mut free = 0usize;
        let mut sum_free = 0.0;
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;

        for t in 0..self.y.len() {
            let yg = self.y[t] * self.gradient[t];
            let at_upper = self.is_upper_bound(t);
            let at_lower = self.is_lower_bound(t);

            if (at_upper && self.y[t] < 0.0) || (at_lower && self.y[t] > 0.0) {
                upper = upper.min(yg);
            } else if at_upper || at_lower {
                lower = lower.max(yg);
            } else {
                free += 1;
                sum_free += yg;
            }
        }

        if free > 0 {
            sum_free / free as f64
        } else {
            (upper + lower) / 2.0
        }
    }

    /// Dual objective Σαᵢ - ½ αᵀQα
    fn objective(&self) -> f64 {
        self.alpha
            .iter()
            .zip(&self.gradient)
            .map(|(a, g)| a * (1.0 - g))
            .sum::<f64>()
            / 2.0
    }
}
