//! High-level API for mixed-kernel SVM estimation and training
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mixsvm::api::MixedKernelSVM;
//! use mixsvm::config::FeatureSchema;
//! use mixsvm::data::MixedCSVDataset;
//! use mixsvm::core::Dataset;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = FeatureSchema::from_file("schema.json")?;
//! let train = MixedCSVDataset::from_file("train.csv", &schema)?;
//!
//! let model = MixedKernelSVM::new()
//!     .with_c_candidates(vec![0.1, 1.0, 10.0])
//!     .with_folds(5)
//!     .with_seed(7)
//!     .fit(&schema, &train.samples())?;
//!
//! println!("gamma = {}, C = {}", model.gamma(), model.c());
//!
//! let test = MixedCSVDataset::from_file("test.csv", &schema)?;
//! println!("Accuracy: {:.2}%", model.accuracy(&test.samples())? * 100.0);
//! # Ok(())
//! # }
//! ```

use crate::cache::CachedKernelMatrix;
use crate::config::{FeatureConfiguration, FeatureSchema, UnseenCategoryPolicy};
use crate::core::{OptimizerConfig, Prediction, Record, Result, SVMError, SVMModel, Sample};
use crate::estimate::{CEstimate, CEstimator, GammaEstimate, GammaEstimator};
use crate::kernel::{AggregateKernel, GramMatrix, InnerKernel, Kernel, PrecomputedKernel};
use crate::optimizer::{SVMOptimizer, TrainedSVM};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Default C search grid
pub const DEFAULT_C_CANDIDATES: [f64; 5] = [0.01, 0.1, 1.0, 10.0, 100.0];

/// Estimated (or fixed) kernel hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HyperParameters {
    pub gamma: f64,
    pub c: f64,
    /// Present when gamma was estimated rather than fixed
    pub gamma_estimate: Option<GammaEstimate>,
    /// Present when C was estimated rather than fixed
    pub c_estimate: Option<CEstimate>,
}

/// Hyperparameters plus the realized training Gram matrix
#[derive(Debug, Clone)]
pub struct Estimation {
    pub configuration: Arc<FeatureConfiguration>,
    pub hyperparameters: HyperParameters,
    pub gram: Option<Arc<GramMatrix>>,
}

/// Mixed-kernel SVM with builder-style settings
#[derive(Debug, Clone)]
pub struct MixedKernelSVM {
    c_candidates: Vec<f64>,
    folds: usize,
    seed: u64,
    gamma: Option<f64>,
    c: Option<f64>,
    config: OptimizerConfig,
    unseen_policy: UnseenCategoryPolicy,
    precompute: bool,
    configuration: Option<FeatureConfiguration>,
}

impl MixedKernelSVM {
    pub fn new() -> Self {
        Self {
            c_candidates: DEFAULT_C_CANDIDATES.to_vec(),
            folds: 5,
            seed: 42,
            gamma: None,
            c: None,
            config: OptimizerConfig::default(),
            unseen_policy: UnseenCategoryPolicy::default(),
            precompute: true,
            configuration: None,
        }
    }

    /// Candidate values searched by cross-validation
    pub fn with_c_candidates(mut self, candidates: Vec<f64>) -> Self {
        self.c_candidates = candidates;
        self
    }

    pub fn with_folds(mut self, folds: usize) -> Self {
        self.folds = folds;
        self
    }

    /// Seed of the fold assignment
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fix gamma instead of estimating it
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    /// Fix C instead of estimating it
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = Some(c);
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.config.epsilon = epsilon;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Kernel cache size in bytes, used when precomputation is off
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.config.cache_size = cache_size;
        self
    }

    pub fn with_unseen_category_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen_policy = policy;
        self
    }

    /// Materialize the training Gram matrix for the final fit
    ///
    /// C estimation always precomputes; with a fixed C and precomputation
    /// off, the final fit evaluates the kernel lazily.
    pub fn with_precompute(mut self, precompute: bool) -> Self {
        self.precompute = precompute;
        self
    }

    /// Use a hand-built configuration instead of deriving one from the schema
    pub fn with_configuration(mut self, configuration: FeatureConfiguration) -> Self {
        self.configuration = Some(configuration);
        self
    }

    /// Estimate gamma and C without fitting the final model
    pub fn estimate(&self, schema: &FeatureSchema, samples: &[Sample]) -> Result<Estimation> {
        let prepared = self.prepare(schema, samples)?;
        Ok(Estimation {
            configuration: prepared.kernel.inner().shared_config(),
            hyperparameters: prepared.hyperparameters,
            gram: prepared.precomputed.map(|p| Arc::clone(p.gram())),
        })
    }

    /// Configuration, gamma, Gram matrix, C, then the final fit
    pub fn fit(&self, schema: &FeatureSchema, samples: &[Sample]) -> Result<FittedModel> {
        let prepared = self.prepare(schema, samples)?;
        let optimizer = SVMOptimizer::new(OptimizerConfig {
            c: prepared.hyperparameters.c,
            ..self.config.clone()
        });

        let trained = match &prepared.precomputed {
            Some(precomputed) => optimizer.train(precomputed, &prepared.labels)?,
            None => {
                let lazy = CachedKernelMatrix::new(
                    &prepared.kernel,
                    &prepared.records,
                    self.config.cache_size,
                );
                optimizer.train(&lazy, &prepared.labels)?
            }
        };

        let (model, kept) = trained.compact();
        let support = kept.iter().map(|&i| prepared.records[i].clone()).collect();
        info!(
            "Final model: {} class(es), {} support record(s) of {}",
            model.classes().len(),
            kept.len(),
            prepared.records.len()
        );

        Ok(FittedModel {
            kernel: prepared.kernel,
            model,
            support,
            hyperparameters: prepared.hyperparameters,
            gram: prepared.precomputed.map(|p| Arc::clone(p.gram())),
        })
    }

    fn prepare(&self, schema: &FeatureSchema, samples: &[Sample]) -> Result<Prepared> {
        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        let configuration = match &self.configuration {
            Some(manual) => {
                if manual.n_features() != schema.len() {
                    return Err(SVMError::DimensionMismatch {
                        expected: schema.len(),
                        actual: manual.n_features(),
                    });
                }
                for sample in samples {
                    schema.check_record(&sample.record)?;
                }
                manual.clone()
            }
            None => FeatureConfiguration::from_training(schema, samples, self.unseen_policy)?,
        };

        let records: Vec<Record> = samples.iter().map(|s| s.record.clone()).collect();
        let labels: Vec<f64> = samples.iter().map(|s| s.label).collect();
        let inner = InnerKernel::new(Arc::new(configuration));

        let (gamma, gamma_estimate) = match self.gamma {
            Some(gamma) => (gamma, None),
            None => {
                let estimate = GammaEstimator::new().estimate(&inner, &records)?;
                (estimate.gamma, Some(estimate))
            }
        };
        let kernel = AggregateKernel::new(inner, gamma)?;

        let precomputed = if self.precompute || self.c.is_none() {
            Some(kernel.precompute(&records)?)
        } else {
            None
        };

        let (c, c_estimate) = match (self.c, &precomputed) {
            (Some(c), _) => (c, None),
            (None, Some(precomputed)) => {
                let estimate = CEstimator::new(self.c_candidates.clone())
                    .with_folds(self.folds)
                    .with_seed(self.seed)
                    .with_optimizer_config(self.config.clone())
                    .estimate(precomputed, &labels)?;
                (estimate.c, Some(estimate))
            }
            (None, None) => {
                return Err(SVMError::MissingParameter(
                    "C estimation needs the training Gram matrix".to_string(),
                ))
            }
        };

        Ok(Prepared {
            kernel,
            records,
            labels,
            precomputed,
            hyperparameters: HyperParameters {
                gamma,
                c,
                gamma_estimate,
                c_estimate,
            },
        })
    }
}

impl Default for MixedKernelSVM {
    fn default() -> Self {
        Self::new()
    }
}

struct Prepared {
    kernel: AggregateKernel,
    records: Vec<Record>,
    labels: Vec<f64>,
    precomputed: Option<PrecomputedKernel>,
    hyperparameters: HyperParameters,
}

/// Trained mixed-kernel SVM
///
/// Keeps only the support records; prediction evaluates the aggregate
/// kernel between the query and each of them once.
#[derive(Debug, Clone)]
pub struct FittedModel {
    kernel: AggregateKernel,
    model: TrainedSVM,
    support: Vec<Record>,
    hyperparameters: HyperParameters,
    gram: Option<Arc<GramMatrix>>,
}

impl FittedModel {
    /// Reassemble a model; support indices of `model` address `support`
    pub fn from_parts(
        configuration: FeatureConfiguration,
        hyperparameters: HyperParameters,
        model: TrainedSVM,
        support: Vec<Record>,
    ) -> Result<Self> {
        configuration.validate()?;
        if let Some(&bad) = model.support_indices().iter().find(|&&s| s >= support.len()) {
            return Err(SVMError::InvalidParameter(format!(
                "Support index {bad} out of range for {} support records",
                support.len()
            )));
        }
        if let Some(record) = support
            .iter()
            .find(|r| r.len() != configuration.n_features())
        {
            return Err(SVMError::DimensionMismatch {
                expected: configuration.n_features(),
                actual: record.len(),
            });
        }

        let kernel = AggregateKernel::new(
            InnerKernel::new(Arc::new(configuration)),
            hyperparameters.gamma,
        )?;
        Ok(Self {
            kernel,
            model,
            support,
            hyperparameters,
            gram: None,
        })
    }

    pub fn predict(&self, record: &Record) -> Result<Prediction> {
        if record.len() != self.configuration().n_features() {
            return Err(SVMError::DimensionMismatch {
                expected: self.configuration().n_features(),
                actual: record.len(),
            });
        }
        self.model
            .predict_with(|s| self.kernel.compute(&self.support[s], record))
    }

    pub fn predict_batch(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        records.par_iter().map(|r| self.predict(r)).collect()
    }

    /// Fraction of samples whose label is predicted correctly
    pub fn accuracy(&self, samples: &[Sample]) -> Result<f64> {
        Ok(self.evaluate(samples)?.accuracy())
    }

    /// Fraction of samples predicted wrongly
    pub fn misclassification_rate(&self, samples: &[Sample]) -> Result<f64> {
        Ok(self.evaluate(samples)?.misclassification_rate())
    }

    pub fn evaluate(&self, samples: &[Sample]) -> Result<EvaluationMetrics> {
        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        let records: Vec<Record> = samples.iter().map(|s| s.record.clone()).collect();
        let predictions = self.predict_batch(&records)?;
        let correct = predictions
            .iter()
            .zip(samples)
            .filter(|(p, s)| p.label == s.label)
            .count();
        Ok(EvaluationMetrics {
            n_samples: samples.len(),
            n_correct: correct,
        })
    }

    pub fn gamma(&self) -> f64 {
        self.hyperparameters.gamma
    }

    pub fn c(&self) -> f64 {
        self.hyperparameters.c
    }

    pub fn hyperparameters(&self) -> &HyperParameters {
        &self.hyperparameters
    }

    /// Training Gram matrix, when it was materialized
    pub fn gram(&self) -> Option<&GramMatrix> {
        self.gram.as_deref()
    }

    pub fn configuration(&self) -> &FeatureConfiguration {
        self.kernel.inner().config()
    }

    pub fn kernel(&self) -> &AggregateKernel {
        &self.kernel
    }

    pub fn trained(&self) -> &TrainedSVM {
        &self.model
    }

    pub fn support_records(&self) -> &[Record] {
        &self.support
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            n_features: self.configuration().n_features(),
            classes: self.model.classes().to_vec(),
            n_machines: self.model.machines().len(),
            n_support_records: self.support.len(),
            gamma: self.gamma(),
            c: self.c(),
        }
    }
}

impl SVMModel for FittedModel {
    fn predict(&self, record: &Record) -> Result<Prediction> {
        FittedModel::predict(self, record)
    }

    fn predict_batch(&self, records: &[Record]) -> Result<Vec<Prediction>> {
        FittedModel::predict_batch(self, records)
    }

    fn n_support_vectors(&self) -> usize {
        self.support.len()
    }
}

/// Hit counts over an evaluation set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub n_samples: usize,
    pub n_correct: usize,
}

impl EvaluationMetrics {
    pub fn accuracy(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            self.n_correct as f64 / self.n_samples as f64
        }
    }

    pub fn misclassification_rate(&self) -> f64 {
        if self.n_samples == 0 {
            0.0
        } else {
            1.0 - self.accuracy()
        }
    }
}

/// Model summary
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub n_features: usize,
    pub classes: Vec<f64>,
    pub n_machines: usize,
    pub n_support_records: usize,
    pub gamma: f64,
    pub c: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureType, KernelFamily};
    use crate::core::FeatureValue;
    use approx::assert_relative_eq;

    fn schema() -> FeatureSchema {
        FeatureSchema::from_types(&[
            FeatureType::Continuous,
            FeatureType::Categorical,
            FeatureType::Categorical,
        ])
    }

    fn sample(x: f64, binary: u32, level: u32, label: f64) -> Sample {
        Sample::new(
            Record::new(vec![
                FeatureValue::Numeric(x),
                FeatureValue::Categorical(binary),
                FeatureValue::Categorical(level),
            ]),
            label,
        )
    }

    fn training_samples() -> Vec<Sample> {
        (0..24)
            .map(|i| {
                let positive = i % 2 == 0;
                let x = if positive { 2.0 + i as f64 * 0.05 } else { -2.0 - i as f64 * 0.05 };
                let binary = if positive { 1 } else { 2 };
                let level = 1 + (i as u32 % 3);
                sample(x, binary, level, if positive { 1.0 } else { -1.0 })
            })
            .collect()
    }

    #[test]
    fn test_builder_settings() {
        let svm = MixedKernelSVM::new()
            .with_c_candidates(vec![1.0, 2.0])
            .with_folds(3)
            .with_seed(9)
            .with_gamma(0.5)
            .with_c(2.0)
            .with_epsilon(1e-4)
            .with_max_iterations(500)
            .with_cache_size(1024)
            .with_unseen_category_policy(UnseenCategoryPolicy::Pseudocount)
            .with_precompute(false);

        assert_eq!(svm.c_candidates, vec![1.0, 2.0]);
        assert_eq!(svm.folds, 3);
        assert_eq!(svm.seed, 9);
        assert_eq!(svm.gamma, Some(0.5));
        assert_eq!(svm.c, Some(2.0));
        assert_eq!(svm.config.epsilon, 1e-4);
        assert_eq!(svm.config.max_iterations, 500);
        assert_eq!(svm.config.cache_size, 1024);
        assert_eq!(svm.unseen_policy, UnseenCategoryPolicy::Pseudocount);
        assert!(!svm.precompute);
    }

    #[test]
    fn test_fit_and_predict_training_set() {
        let samples = training_samples();
        let model = MixedKernelSVM::new()
            .with_c_candidates(vec![1.0, 10.0])
            .with_folds(4)
            .fit(&schema(), &samples)
            .unwrap();

        assert!(model.gamma() > 0.0);
        assert!(model.c() == 1.0 || model.c() == 10.0);
        assert_eq!(model.accuracy(&samples).unwrap(), 1.0);
        assert_eq!(model.misclassification_rate(&samples).unwrap(), 0.0);
        assert!(model.n_support_vectors() > 0);
        assert!(model.n_support_vectors() <= samples.len());

        let gram = model.gram().unwrap();
        assert_eq!(gram.len(), samples.len());

        let info = model.info();
        assert_eq!(info.classes, vec![-1.0, 1.0]);
        assert_eq!(info.n_machines, 1);
        assert_eq!(info.n_features, 3);
    }

    #[test]
    fn test_estimate_reports_both_parameters() {
        let samples = training_samples();
        let estimation = MixedKernelSVM::new()
            .with_c_candidates(vec![0.5, 5.0])
            .with_folds(3)
            .estimate(&schema(), &samples)
            .unwrap();

        let hyper = &estimation.hyperparameters;
        let gamma_estimate = hyper.gamma_estimate.unwrap();
        assert_eq!(hyper.gamma, gamma_estimate.gamma);
        assert_eq!(gamma_estimate.n_pairs, 24 * 23 / 2);
        assert_eq!(hyper.c_estimate.as_ref().unwrap().c, hyper.c);
        assert_eq!(estimation.gram.unwrap().len(), 24);
        assert_eq!(estimation.configuration.groups().len(), 3);
    }

    #[test]
    fn test_fixed_parameters_skip_estimation() {
        let samples = training_samples();
        let model = MixedKernelSVM::new()
            .with_gamma(1.5)
            .with_c(3.0)
            .fit(&schema(), &samples)
            .unwrap();
        assert_eq!(model.gamma(), 1.5);
        assert_eq!(model.c(), 3.0);
        assert!(model.hyperparameters().gamma_estimate.is_none());
        assert!(model.hyperparameters().c_estimate.is_none());
    }

    #[test]
    fn test_lazy_fit_matches_precomputed_fit() {
        let samples = training_samples();
        let base = MixedKernelSVM::new().with_gamma(2.0).with_c(1.0);
        let eager = base.clone().fit(&schema(), &samples).unwrap();
        let lazy = base
            .with_precompute(false)
            .with_cache_size(4096)
            .fit(&schema(), &samples)
            .unwrap();

        assert!(lazy.gram().is_none());
        assert_eq!(eager.n_support_vectors(), lazy.n_support_vectors());
        for s in &samples {
            let a = eager.predict(&s.record).unwrap();
            let b = lazy.predict(&s.record).unwrap();
            assert_eq!(a.label, b.label);
            assert_relative_eq!(a.decision_value, b.decision_value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_manual_configuration() {
        let samples = training_samples();
        let configuration = FeatureConfiguration::builder(3)
            .group(KernelFamily::Linear, vec![0])
            .group(KernelFamily::Jaccard, vec![1])
            .positive_level(1, 1)
            .group(KernelFamily::Jaccard, vec![2])
            .positive_level(2, 1)
            .build()
            .unwrap();
        let model = MixedKernelSVM::new()
            .with_configuration(configuration.clone())
            .with_gamma(1.0)
            .with_c(1.0)
            .fit(&schema(), &samples)
            .unwrap();
        assert_eq!(model.configuration(), &configuration);
    }

    #[test]
    fn test_unseen_category_at_prediction() {
        let samples = training_samples();
        let unseen = sample(2.0, 1, 9, 1.0).record;

        // against training records an unseen code is a plain mismatch
        let strict = MixedKernelSVM::new()
            .with_gamma(1.0)
            .with_c(1.0)
            .fit(&schema(), &samples)
            .unwrap();
        assert_eq!(strict.predict(&unseen).unwrap().label, 1.0);

        // comparing it with itself needs its probability
        assert!(matches!(
            strict.kernel().compute(&unseen, &unseen),
            Err(SVMError::UnseenCategory { feature: 2, value: 9 })
        ));

        let lenient = MixedKernelSVM::new()
            .with_gamma(1.0)
            .with_c(1.0)
            .with_unseen_category_policy(UnseenCategoryPolicy::Pseudocount)
            .fit(&schema(), &samples)
            .unwrap();
        assert!(lenient.kernel().compute(&unseen, &unseen).unwrap() < 1.0);
        assert_eq!(
            lenient.predict(&unseen).unwrap(),
            strict.predict(&unseen).unwrap()
        );
    }

    #[test]
    fn test_predict_dimension_mismatch() {
        let model = MixedKernelSVM::new()
            .with_gamma(1.0)
            .with_c(1.0)
            .fit(&schema(), &training_samples())
            .unwrap();
        assert!(matches!(
            model.predict(&Record::numeric(&[1.0])),
            Err(SVMError::DimensionMismatch {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_fit_errors() {
        assert!(matches!(
            MixedKernelSVM::new().fit(&schema(), &[]),
            Err(SVMError::EmptyDataset)
        ));
        let samples = training_samples();
        assert!(matches!(
            MixedKernelSVM::new().with_gamma(-1.0).fit(&schema(), &samples),
            Err(SVMError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_evaluation_metrics() {
        let metrics = EvaluationMetrics {
            n_samples: 8,
            n_correct: 6,
        };
        assert_eq!(metrics.accuracy(), 0.75);
        assert_eq!(metrics.misclassification_rate(), 0.25);
    }
}
