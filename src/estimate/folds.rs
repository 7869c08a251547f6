//! Seeded k-fold partition of training indices

use crate::core::{Result, SVMError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Random, unstratified partition of 0..n into k folds of near-equal size
#[derive(Debug, Clone, PartialEq)]
pub struct KFold {
    n: usize,
    folds: Vec<Vec<usize>>,
    seed: u64,
}

impl KFold {
    /// Shuffle 0..n with `seed` and cut the permutation into k runs
    ///
    /// Fold sizes differ by at most one.
    pub fn new(n: usize, k: usize, seed: u64) -> Result<Self> {
        if k < 2 {
            return Err(SVMError::InvalidParameter(format!(
                "Fold count must be at least 2, got: {k}"
            )));
        }
        if k > n {
            return Err(SVMError::InvalidParameter(format!(
                "Cannot split {n} records into {k} folds"
            )));
        }

        let mut permutation: Vec<usize> = (0..n).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        permutation.shuffle(&mut rng);

        let folds = (0..k)
            .map(|f| {
                let mut fold = permutation[f * n / k..(f + 1) * n / k].to_vec();
                fold.sort_unstable();
                fold
            })
            .collect();

        Ok(Self { n, folds, seed })
    }

    pub fn k(&self) -> usize {
        self.folds.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn folds(&self) -> &[Vec<usize>] {
        &self.folds
    }

    /// (training indices, held-out indices) per fold, both ascending
    pub fn splits(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        (0..self.folds.len())
            .map(|f| {
                let held_out = self.folds[f].clone();
                let mut training: Vec<usize> = self
                    .folds
                    .iter()
                    .enumerate()
                    .filter(|&(g, _)| g != f)
                    .flat_map(|(_, fold)| fold.iter().copied())
                    .collect();
                training.sort_unstable();
                (training, held_out)
            })
            .collect()
    }

    /// Fold index of every record
    pub fn assignment(&self) -> Vec<usize> {
        let mut assignment = vec![0; self.n];
        for (f, fold) in self.folds.iter().enumerate() {
            for &i in fold {
                assignment[i] = f;
            }
        }
        assignment
    }
}
