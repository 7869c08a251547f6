//! Gram matrices and index-addressed kernel access
//!
//! The solver only sees kernel values by index pair through
//! [`KernelMatrix`]. A [`GramMatrix`] materializes every pair once; a
//! [`PrecomputedKernel`] shares it between cross-validation folds, and a
//! [`SubsetKernel`] re-indexes any matrix to a subset of its rows.

use crate::core::{Record, Result, SVMError};
use crate::kernel::Kernel;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Kernel values addressed by index pair
pub trait KernelMatrix: Send + Sync {
    /// Number of rows (and columns)
    fn size(&self) -> usize;

    /// Kernel value K(i, j)
    fn value(&self, i: usize, j: usize) -> Result<f64>;

    /// Full row i
    fn row(&self, i: usize) -> Result<Vec<f64>> {
        (0..self.size()).map(|j| self.value(i, j)).collect()
    }
}

/// Dense symmetric n×n matrix of kernel values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GramMatrix {
    n: usize,
    values: Vec<f64>,
}

impl GramMatrix {
    /// Evaluate a kernel on every pair of records
    ///
    /// Rows of the upper triangle are computed in parallel and mirrored
    /// afterwards.
    pub fn compute<K: Kernel + ?Sized>(kernel: &K, records: &[Record]) -> Result<Self> {
        let n = records.len();
        let upper: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                (i..n)
                    .map(|j| kernel.compute(&records[i], &records[j]))
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        let mut values = vec![0.0; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, value) in row.into_iter().enumerate() {
                let j = i + offset;
                values[i * n + j] = value;
                values[j * n + i] = value;
            }
        }

        Ok(Self { n, values })
    }

    /// Wrap row-major values; the matrix must be square and symmetric
    pub fn from_values(n: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != n * n {
            return Err(SVMError::DimensionMismatch {
                expected: n * n,
                actual: values.len(),
            });
        }
        for i in 0..n {
            for j in (i + 1)..n {
                if values[i * n + j] != values[j * n + i] {
                    return Err(SVMError::InvalidParameter(format!(
                        "Gram matrix is not symmetric at ({i}, {j})"
                    )));
                }
            }
        }
        Ok(Self { n, values })
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// # Panics
    /// Panics if i or j >= len()
    pub fn get(&self, i: usize, j: usize) -> f64 {
        assert!(i < self.n && j < self.n, "Gram index ({i}, {j}) out of range");
        self.values[i * self.n + j]
    }

    pub fn row_slice(&self, i: usize) -> &[f64] {
        &self.values[i * self.n..(i + 1) * self.n]
    }

    pub fn diagonal(&self) -> Vec<f64> {
        (0..self.n).map(|i| self.values[i * self.n + i]).collect()
    }
}

impl KernelMatrix for GramMatrix {
    fn size(&self) -> usize {
        self.n
    }

    fn value(&self, i: usize, j: usize) -> Result<f64> {
        check_index(i, j, self.n)?;
        Ok(self.values[i * self.n + j])
    }

    fn row(&self, i: usize) -> Result<Vec<f64>> {
        check_index(i, 0, self.n.max(1))?;
        Ok(self.row_slice(i).to_vec())
    }
}

/// Shared, read-only Gram matrix serving kernel lookups by record index
#[derive(Debug, Clone)]
pub struct PrecomputedKernel {
    gram: Arc<GramMatrix>,
}

impl PrecomputedKernel {
    pub fn new(gram: Arc<GramMatrix>) -> Self {
        Self { gram }
    }

    /// Kernel value between training records i and j
    pub fn lookup(&self, i: usize, j: usize) -> f64 {
        self.gram.get(i, j)
    }

    pub fn gram(&self) -> &Arc<GramMatrix> {
        &self.gram
    }
}

impl KernelMatrix for PrecomputedKernel {
    fn size(&self) -> usize {
        self.gram.len()
    }

    fn value(&self, i: usize, j: usize) -> Result<f64> {
        self.gram.value(i, j)
    }

    fn row(&self, i: usize) -> Result<Vec<f64>> {
        self.gram.row(i)
    }
}

/// View of a kernel matrix restricted to (and re-indexed by) a subset
pub struct SubsetKernel<'a, M: KernelMatrix + ?Sized> {
    inner: &'a M,
    indices: Vec<usize>,
}

impl<'a, M: KernelMatrix + ?Sized> SubsetKernel<'a, M> {
    pub fn new(inner: &'a M, indices: Vec<usize>) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= inner.size()) {
            return Err(SVMError::InvalidParameter(format!(
                "Subset index {bad} out of range for {} rows",
                inner.size()
            )));
        }
        Ok(Self { inner, indices })
    }

    /// Index in the underlying matrix of subset row i
    pub fn original_index(&self, i: usize) -> usize {
        self.indices[i]
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl<'a, M: KernelMatrix + ?Sized> KernelMatrix for SubsetKernel<'a, M> {
    fn size(&self) -> usize {
        self.indices.len()
    }

    fn value(&self, i: usize, j: usize) -> Result<f64> {
        check_index(i, j, self.indices.len())?;
        self.inner.value(self.indices[i], self.indices[j])
    }
}

fn check_index(i: usize, j: usize, n: usize) -> Result<()> {
    if i >= n || j >= n {
        return Err(SVMError::InvalidParameter(format!(
            "Kernel index ({i}, {j}) out of range for {n} rows"
        )));
    }
    Ok(())
}
