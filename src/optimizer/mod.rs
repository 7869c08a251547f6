//! Optimization algorithms for SVM
//!
//! Integrates the binary SMO solver into multiclass training. Outcomes
//! with more than two classes are handled one-vs-one: a machine per class
//! pair, trained on the rows of those two classes, and a majority vote at
//! prediction time.

use crate::core::{OptimizerConfig, Prediction, Result, SVMError};
use crate::kernel::{KernelMatrix, SubsetKernel};
use crate::solver::SMOSolver;
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// High-level SVM optimizer over an index-addressed kernel
#[derive(Debug, Clone)]
pub struct SVMOptimizer {
    config: OptimizerConfig,
}

impl SVMOptimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Train on every row of `kernel`; `labels[i]` is the class of row i
    ///
    /// Support indices of the returned model refer to rows of `kernel`.
    pub fn train<M: KernelMatrix + ?Sized>(&self, kernel: &M, labels: &[f64]) -> Result<TrainedSVM> {
        if labels.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if kernel.size() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: kernel.size(),
                actual: labels.len(),
            });
        }
        if let Some(&bad) = labels.iter().find(|y| !y.is_finite()) {
            return Err(SVMError::InvalidLabel(bad));
        }

        let classes = distinct_classes(labels);
        let pairs: Vec<(f64, f64)> = classes
            .iter()
            .enumerate()
            .flat_map(|(a, &low)| classes[a + 1..].iter().map(move |&high| (low, high)))
            .collect();

        let solver = SMOSolver::new(self.config.clone());
        let machines = pairs
            .into_par_iter()
            .map(|(negative, positive)| {
                train_pair(&solver, kernel, labels, negative, positive)
            })
            .collect::<Result<Vec<BinaryMachine>>>()?;

        debug!(
            "Trained {} machine(s) for {} class(es) on {} rows",
            machines.len(),
            classes.len(),
            labels.len()
        );

        Ok(TrainedSVM { classes, machines })
    }
}

fn distinct_classes(labels: &[f64]) -> Vec<f64> {
    let mut classes = labels.to_vec();
    classes.sort_by(f64::total_cmp);
    classes.dedup();
    classes
}

fn train_pair<M: KernelMatrix + ?Sized>(
    solver: &SMOSolver,
    kernel: &M,
    labels: &[f64],
    negative: f64,
    positive: f64,
) -> Result<BinaryMachine> {
    let rows: Vec<usize> = (0..labels.len())
        .filter(|&i| labels[i] == negative || labels[i] == positive)
        .collect();
    let signs: Vec<f64> = rows
        .iter()
        .map(|&i| if labels[i] == positive { 1.0 } else { -1.0 })
        .collect();

    let subset = SubsetKernel::new(kernel, rows)?;
    let result = solver.solve(&subset, &signs)?;

    let support = result
        .support_vectors
        .iter()
        .map(|&s| subset.original_index(s))
        .collect();
    let coefficients = result
        .support_vectors
        .iter()
        .map(|&s| result.alpha[s] * signs[s])
        .collect();

    Ok(BinaryMachine {
        positive,
        negative,
        support,
        coefficients,
        bias: result.b,
    })
}

/// Two-class decision function f(x) = Σ coefᵢ K(svᵢ, x) + bias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryMachine {
    /// Class predicted when f(x) >= 0
    pub positive: f64,
    /// Class predicted when f(x) < 0
    pub negative: f64,
    /// Support row indices
    pub support: Vec<usize>,
    /// αᵢyᵢ per support row
    pub coefficients: Vec<f64>,
    pub bias: f64,
}

impl BinaryMachine {
    fn decision(&self, kernel_values: &BTreeMap<usize, f64>) -> f64 {
        self.support
            .iter()
            .zip(&self.coefficients)
            .map(|(s, coef)| coef * kernel_values.get(s).copied().unwrap_or(0.0))
            .sum::<f64>()
            + self.bias
    }
}

/// A trained one-vs-one SVM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedSVM {
    classes: Vec<f64>,
    machines: Vec<BinaryMachine>,
}

impl TrainedSVM {
    pub fn from_parts(classes: Vec<f64>, machines: Vec<BinaryMachine>) -> Result<Self> {
        if classes.is_empty() {
            return Err(SVMError::InvalidParameter(
                "Model needs at least one class".to_string(),
            ));
        }
        let expected = classes.len() * (classes.len() - 1) / 2;
        if machines.len() != expected {
            return Err(SVMError::DimensionMismatch {
                expected,
                actual: machines.len(),
            });
        }
        if let Some(machine) = machines
            .iter()
            .find(|m| m.support.len() != m.coefficients.len())
        {
            return Err(SVMError::DimensionMismatch {
                expected: machine.support.len(),
                actual: machine.coefficients.len(),
            });
        }
        Ok(Self { classes, machines })
    }

    /// Sorted distinct class labels
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    pub fn machines(&self) -> &[BinaryMachine] {
        &self.machines
    }

    /// Distinct support rows over all machines, ascending
    pub fn support_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .machines
            .iter()
            .flat_map(|m| m.support.iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Renumber support rows to 0..m in ascending order of the old index
    ///
    /// Returns the compacted model and the old index of each new row.
    pub fn compact(&self) -> (Self, Vec<usize>) {
        let kept = self.support_indices();
        let position: BTreeMap<usize, usize> =
            kept.iter().enumerate().map(|(new, &old)| (old, new)).collect();

        let machines = self
            .machines
            .iter()
            .map(|m| BinaryMachine {
                support: m.support.iter().map(|s| position[s]).collect(),
                ..m.clone()
            })
            .collect();

        (
            Self {
                classes: self.classes.clone(),
                machines,
            },
            kept,
        )
    }

    /// Predict a query given its kernel value against support row `s`
    ///
    /// `kernel_to` is called once per distinct support row.
    pub fn predict_with<F>(&self, mut kernel_to: F) -> Result<Prediction>
    where
        F: FnMut(usize) -> Result<f64>,
    {
        if self.machines.is_empty() {
            return Ok(Prediction::new(self.classes[0], 1.0));
        }

        let mut kernel_values = BTreeMap::new();
        for s in self.support_indices() {
            kernel_values.insert(s, kernel_to(s)?);
        }

        if let [machine] = self.machines.as_slice() {
            let value = machine.decision(&kernel_values);
            let label = if value >= 0.0 {
                machine.positive
            } else {
                machine.negative
            };
            return Ok(Prediction::new(label, value));
        }

        let mut votes = vec![0usize; self.classes.len()];
        for machine in &self.machines {
            let winner = if machine.decision(&kernel_values) >= 0.0 {
                machine.positive
            } else {
                machine.negative
            };
            if let Some(k) = self.classes.iter().position(|&c| c == winner) {
                votes[k] += 1;
            }
        }

        // first maximum wins, so ties go to the smallest class
        let mut best = 0;
        for k in 1..votes.len() {
            if votes[k] > votes[best] {
                best = k;
            }
        }

        let share = votes[best] as f64 / self.machines.len() as f64;
        Ok(Prediction::new(self.classes[best], share))
    }
}
