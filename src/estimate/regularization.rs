//! Regularization (C) estimation by k-fold cross-validation
//!
//! Every candidate is scored on the same seeded fold partition by its
//! mean held-out misclassification rate, in percent. The smallest score
//! wins; among equal scores the first candidate in input order is taken.

use crate::core::{OptimizerConfig, Result, SVMError};
use crate::estimate::KFold;
use crate::kernel::{KernelMatrix, SubsetKernel};
use crate::optimizer::SVMOptimizer;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Cross-validation score of one C candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub c: f64,
    /// Mean held-out misclassification rate, in percent
    pub error_percent: f64,
    /// Misclassification rate of each fold, in [0, 1]
    pub fold_errors: Vec<f64>,
}

/// Outcome of a C search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CEstimate {
    pub c: f64,
    /// Empty when a single candidate was given
    pub scores: Vec<CandidateScore>,
    /// Candidates sharing the minimal score, in input order
    pub tied: Vec<f64>,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct CEstimator {
    candidates: Vec<f64>,
    folds: usize,
    seed: u64,
    config: OptimizerConfig,
}

impl CEstimator {
    pub fn new(candidates: Vec<f64>) -> Self {
        Self {
            candidates,
            folds: 5,
            seed: 42,
            config: OptimizerConfig::default(),
        }
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Solver settings for the fold fits; `c` is replaced per candidate
    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn candidates(&self) -> &[f64] {
        &self.candidates
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Pick C for the training rows of `kernel` labelled by `labels`
    pub fn estimate<M: KernelMatrix + ?Sized>(&self, kernel: &M, labels: &[f64]) -> Result<CEstimate> {
        if self.candidates.is_empty() {
            return Err(SVMError::InvalidParameter(
                "No C candidates given".to_string(),
            ));
        }
        if let Some(&bad) = self.candidates.iter().find(|c| !(**c > 0.0 && c.is_finite())) {
            return Err(SVMError::InvalidParameter(format!(
                "C candidates must be positive and finite, got: {bad}"
            )));
        }
        if kernel.size() != labels.len() {
            return Err(SVMError::DimensionMismatch {
                expected: kernel.size(),
                actual: labels.len(),
            });
        }

        if let [c] = self.candidates.as_slice() {
            info!("Single C candidate {c}, skipping cross-validation");
            return Ok(CEstimate {
                c: *c,
                scores: Vec::new(),
                tied: Vec::new(),
                seed: self.seed,
            });
        }

        let kfold = KFold::new(labels.len(), self.folds, self.seed)?;
        let splits = kfold.splits();
        debug!(
            "Cross-validating {} C candidates over {} folds (seed {})",
            self.candidates.len(),
            splits.len(),
            self.seed
        );

        let scores = self
            .candidates
            .par_iter()
            .map(|&c| self.score(kernel, labels, &splits, c))
            .collect::<Result<Vec<CandidateScore>>>()?;

        for score in &scores {
            debug!("C = {}: {:.4}% misclassified", score.c, score.error_percent);
        }

        let best = scores
            .iter()
            .map(|s| s.error_percent)
            .fold(f64::INFINITY, f64::min);
        let tied: Vec<f64> = scores
            .iter()
            .filter(|s| s.error_percent == best)
            .map(|s| s.c)
            .collect();
        let c = tied[0];

        if tied.len() > 1 {
            warn!(
                "C candidates {:?} tie at {:.4}% error; taking the first, {}",
                tied, best, c
            );
        }
        info!("Estimated C = {} ({:.4}% CV error)", c, best);

        Ok(CEstimate {
            c,
            scores,
            tied,
            seed: self.seed,
        })
    }

    fn score<M: KernelMatrix + ?Sized>(
        &self,
        kernel: &M,
        labels: &[f64],
        splits: &[(Vec<usize>, Vec<usize>)],
        c: f64,
    ) -> Result<CandidateScore> {
        let optimizer = SVMOptimizer::new(OptimizerConfig {
            c,
            ..self.config.clone()
        });

        let fold_errors = splits
            .iter()
            .map(|(training, held_out)| {
                let subset = SubsetKernel::new(kernel, training.clone())?;
                let training_labels: Vec<f64> = training.iter().map(|&i| labels[i]).collect();
                let model = optimizer.train(&subset, &training_labels)?;

                let mut wrong = 0usize;
                for &t in held_out {
                    let prediction = model.predict_with(|s| kernel.value(training[s], t))?;
                    if prediction.label != labels[t] {
                        wrong += 1;
                    }
                }
                Ok(wrong as f64 / held_out.len() as f64)
            })
            .collect::<Result<Vec<f64>>>()?;

        let error_percent = 100.0 * fold_errors.iter().sum::<f64>() / fold_errors.len() as f64;
        Ok(CandidateScore {
            c,
            error_percent,
            fold_errors,
        })
    }
}
