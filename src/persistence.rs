//! Model serialization and persistence
//!
//! A fitted model is stored as pretty JSON: the feature configuration with
//! its frequency tables, gamma and C (with their estimation summaries), the
//! one-vs-one machines, and the support records they refer to.

use crate::api::{FittedModel, HyperParameters};
use crate::config::FeatureConfiguration;
use crate::core::{Record, Result, SVMError};
use crate::optimizer::TrainedSVM;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Serializable representation of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableModel {
    pub configuration: FeatureConfiguration,
    pub hyperparameters: HyperParameters,
    /// Machines over support rows 0..m
    pub model: TrainedSVM,
    pub support_records: Vec<Record>,
    pub metadata: ModelMetadata,
}

/// Model metadata for tracking and validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    pub n_features: usize,
    pub n_support_records: usize,
    pub classes: Vec<f64>,
    /// Creation timestamp (RFC 3339, UTC)
    pub created_at: String,
}

impl SerializableModel {
    pub fn from_fitted(model: &FittedModel) -> Self {
        Self {
            configuration: model.configuration().clone(),
            hyperparameters: model.hyperparameters().clone(),
            model: model.trained().clone(),
            support_records: model.support_records().to_vec(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                n_features: model.configuration().n_features(),
                n_support_records: model.support_records().len(),
                classes: model.trained().classes().to_vec(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader).map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Rebuild a predicting model
    pub fn into_fitted(self) -> Result<FittedModel> {
        FittedModel::from_parts(
            self.configuration,
            self.hyperparameters,
            self.model,
            self.support_records,
        )
    }

    /// Print model summary
    pub fn print_summary(&self) {
        println!("=== Mixed-Kernel SVM Model Summary ===");
        println!("Features: {}", self.metadata.n_features);
        for group in self.configuration.groups() {
            println!("  {:<10} {:?}", group.family.name(), group.features);
        }
        println!("Classes: {:?}", self.metadata.classes);
        println!("Binary machines: {}", self.model.machines().len());
        println!("Support records: {}", self.metadata.n_support_records);
        println!("Gamma: {:.6}", self.hyperparameters.gamma);
        println!("C: {}", self.hyperparameters.c);
        if let Some(estimate) = &self.hyperparameters.c_estimate {
            println!("  CV seed: {}", estimate.seed);
            for score in &estimate.scores {
                println!("  C = {:<10} {:.2}% error", score.c, score.error_percent);
            }
        }
        println!("Library Version: {}", self.metadata.library_version);
        println!("Created: {}", self.metadata.created_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MixedKernelSVM;
    use crate::config::{FeatureSchema, FeatureType};
    use crate::core::{FeatureValue, Sample};
    use approx::assert_relative_eq;
    use tempfile::NamedTempFile;

    fn samples() -> Vec<Sample> {
        (0..12)
            .map(|i| {
                let positive = i % 2 == 0;
                Sample::new(
                    Record::new(vec![
                        FeatureValue::Numeric(
                            (if positive { 1.0 } else { -1.0 }) * (1.0 + i as f64 * 0.1),
                        ),
                        FeatureValue::Categorical(1 + i as u32 % 4),
                    ]),
                    if positive { 2.0 } else { 1.0 },
                )
            })
            .collect()
    }

    #[test]
    fn test_model_round_trip() -> Result<()> {
        let schema =
            FeatureSchema::from_types(&[FeatureType::Continuous, FeatureType::Categorical]);
        let samples = samples();
        let fitted = MixedKernelSVM::new()
            .with_c_candidates(vec![1.0, 10.0])
            .with_folds(3)
            .fit(&schema, &samples)?;

        let serializable = SerializableModel::from_fitted(&fitted);
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        serializable.save_to_file(temp_file.path())?;

        let loaded = SerializableModel::load_from_file(temp_file.path())?;
        assert_eq!(loaded.metadata.classes, vec![1.0, 2.0]);
        assert_eq!(loaded.configuration.groups(), fitted.configuration().groups());
        assert_eq!(loaded.hyperparameters.c, fitted.c());
        assert_relative_eq!(loaded.hyperparameters.gamma, fitted.gamma(), max_relative = 1e-12);

        let restored = loaded.into_fitted()?;
        for sample in &samples {
            let expected = fitted.predict(&sample.record)?;
            let actual = restored.predict(&sample.record)?;
            assert_eq!(actual.label, expected.label);
            assert_relative_eq!(actual.decision_value, expected.decision_value, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn test_load_rejects_garbage() {
        let temp_file = NamedTempFile::new().expect("Failed to create temp file");
        std::fs::write(temp_file.path(), "{ not json").unwrap();
        assert!(matches!(
            SerializableModel::load_from_file(temp_file.path()),
            Err(SVMError::SerializationError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            SerializableModel::load_from_file("/nonexistent/model.json"),
            Err(SVMError::IoError(_))
        ));
    }
}
