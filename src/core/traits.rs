//! Core traits for mixed-kernel SVM

use crate::core::{Prediction, Record, Result, Sample};

/// Dataset abstraction for labelled mixed-type records
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features per record
    fn dim(&self) -> usize;

    /// Get a single sample by index
    ///
    /// # Panics
    /// Panics if index >= len()
    fn get_sample(&self, i: usize) -> Sample;

    /// All samples in index order
    fn samples(&self) -> Vec<Sample> {
        (0..self.len()).map(|i| self.get_sample(i)).collect()
    }

    /// Get all labels as a vector
    fn get_labels(&self) -> Vec<f64>;

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trained model that classifies records
pub trait SVMModel: Send + Sync {
    /// Predict a single record
    fn predict(&self, record: &Record) -> Result<Prediction>;

    /// Predict multiple records
    fn predict_batch(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        records.iter().map(|r| self.predict(r)).collect()
    }

    /// Get the number of distinct support records
    fn n_support_vectors(&self) -> usize;
}
