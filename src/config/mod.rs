//! Feature configuration: which sub-kernel handles which feature
//!
//! A configuration is derived once from the training schema and data and
//! is frozen afterwards. Training, cross-validation and prediction all
//! read the same configuration, including the categorical frequency
//! tables, so test data never feeds back into the kernel.

pub mod frequency;
pub mod schema;

pub use self::frequency::*;
pub use self::schema::*;

use crate::core::{Result, SVMError, Sample};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Sub-kernel family assigned to a feature group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelFamily {
    Rbf,
    Linear,
    Jaccard,
    Univariate,
}

impl KernelFamily {
    pub fn name(&self) -> &'static str {
        match self {
            KernelFamily::Rbf => "rbf",
            KernelFamily::Linear => "linear",
            KernelFamily::Jaccard => "jaccard",
            KernelFamily::Univariate => "univariate",
        }
    }
}

impl fmt::Display for KernelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelFamily {
    type Err = SVMError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rbf" => Ok(KernelFamily::Rbf),
            "linear" => Ok(KernelFamily::Linear),
            "jaccard" => Ok(KernelFamily::Jaccard),
            "univariate" => Ok(KernelFamily::Univariate),
            _ => Err(SVMError::UnrecognizedKernel(s.to_string())),
        }
    }
}

/// Features evaluated together by one sub-kernel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureGroup {
    pub family: KernelFamily,
    pub features: Vec<usize>,
}

impl FeatureGroup {
    pub fn new(family: KernelFamily, features: Vec<usize>) -> Self {
        Self { family, features }
    }

    /// Number of elementary comparisons this group adds to the average
    ///
    /// Vector-valued groups count once; univariate groups count once per
    /// feature.
    pub fn comparisons(&self) -> usize {
        match self.family {
            KernelFamily::Univariate => self.features.len(),
            KernelFamily::Rbf | KernelFamily::Linear | KernelFamily::Jaccard => 1,
        }
    }
}

/// Frozen mapping from feature index to sub-kernel, plus the
/// training-derived parameters the sub-kernels need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfiguration {
    n_features: usize,
    groups: Vec<FeatureGroup>,
    /// Level coded as 1 for categorical members of Jaccard groups
    positive_levels: BTreeMap<usize, u32>,
    /// Category probabilities of univariate features
    frequencies: BTreeMap<usize, FrequencyTable>,
    #[serde(default)]
    unseen_policy: UnseenCategoryPolicy,
}

impl FeatureConfiguration {
    /// Derive the configuration from the schema and the training samples
    ///
    /// Continuous features form one RBF group. Categorical features with
    /// at most two observed levels form one Jaccard group, coded 1 on the
    /// lowest level. Categorical features with more levels are univariate
    /// and get a frequency table over the training records.
    pub fn from_training(
        schema: &FeatureSchema,
        samples: &[Sample],
        unseen_policy: UnseenCategoryPolicy,
    ) -> Result<Self> {
        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }
        if schema.is_empty() {
            return Err(SVMError::InvalidParameter(
                "Schema must declare at least one feature".to_string(),
            ));
        }
        for sample in samples {
            schema.check_record(&sample.record)?;
        }

        let mut rbf = Vec::new();
        let mut jaccard = Vec::new();
        let mut univariate = Vec::new();
        let mut builder = ConfigurationBuilder::new(schema.len()).unseen_policy(unseen_policy);

        for (index, spec) in schema.features.iter().enumerate() {
            match spec.kind {
                FeatureType::Continuous => rbf.push(index),
                FeatureType::Categorical => {
                    let codes: Vec<u32> = samples
                        .iter()
                        .filter_map(|s| s.record.get(index).and_then(|v| v.as_category()))
                        .collect();
                    let levels: BTreeSet<u32> = codes.iter().copied().collect();

                    if levels.len() <= 2 {
                        let positive = levels.iter().next().copied().ok_or_else(|| {
                            SVMError::InvalidDataset(format!(
                                "Feature '{}' has no observed levels",
                                spec.name
                            ))
                        })?;
                        jaccard.push(index);
                        builder = builder.positive_level(index, positive);
                    } else {
                        univariate.push(index);
                        builder = builder.frequency_table(index, FrequencyTable::from_values(codes)?);
                    }
                }
            }
        }

        debug!(
            "Feature configuration: {} rbf, {} jaccard, {} univariate features",
            rbf.len(),
            jaccard.len(),
            univariate.len()
        );

        for (family, features) in [
            (KernelFamily::Rbf, rbf),
            (KernelFamily::Jaccard, jaccard),
            (KernelFamily::Univariate, univariate),
        ] {
            if !features.is_empty() {
                builder = builder.group(family, features);
            }
        }

        builder.build()
    }

    /// Start a hand-written configuration
    pub fn builder(n_features: usize) -> ConfigurationBuilder {
        ConfigurationBuilder::new(n_features)
    }

    /// Check the one-group-per-feature invariant and parameter placement
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(SVMError::InvalidParameter(
                "Configuration has no feature groups".to_string(),
            ));
        }

        let mut assigned: BTreeMap<usize, KernelFamily> = BTreeMap::new();
        for group in &self.groups {
            if group.features.is_empty() {
                return Err(SVMError::InvalidParameter(format!(
                    "Empty {} group",
                    group.family
                )));
            }
            for &index in &group.features {
                if index >= self.n_features {
                    return Err(SVMError::InvalidParameter(format!(
                        "Feature index {index} out of range for {} features",
                        self.n_features
                    )));
                }
                if let Some(previous) = assigned.insert(index, group.family) {
                    return Err(SVMError::InvalidParameter(format!(
                        "Feature {index} assigned to both {previous} and {} groups",
                        group.family
                    )));
                }
            }
        }

        if let Some(missing) = (0..self.n_features).find(|i| !assigned.contains_key(i)) {
            return Err(SVMError::InvalidParameter(format!(
                "Feature {missing} is not assigned to any kernel group"
            )));
        }

        for (&index, table) in &self.frequencies {
            if assigned.get(&index) != Some(&KernelFamily::Univariate) {
                return Err(SVMError::InvalidParameter(format!(
                    "Frequency table given for non-univariate feature {index}"
                )));
            }
            table.validate()?;
        }
        for &index in self.positive_levels.keys() {
            if assigned.get(&index) != Some(&KernelFamily::Jaccard) {
                return Err(SVMError::InvalidParameter(format!(
                    "Positive level given for non-jaccard feature {index}"
                )));
            }
        }

        Ok(())
    }

    /// Number of feature slots every record must have
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn groups(&self) -> &[FeatureGroup] {
        &self.groups
    }

    /// Family the feature is assigned to
    pub fn family_of(&self, index: usize) -> Option<KernelFamily> {
        self.groups
            .iter()
            .find(|g| g.features.contains(&index))
            .map(|g| g.family)
    }

    pub fn frequency_table(&self, index: usize) -> Option<&FrequencyTable> {
        self.frequencies.get(&index)
    }

    pub fn positive_level(&self, index: usize) -> Option<u32> {
        self.positive_levels.get(&index).copied()
    }

    pub fn unseen_policy(&self) -> UnseenCategoryPolicy {
        self.unseen_policy
    }

    /// Total number of elementary comparisons (the averaging denominator)
    pub fn n_comparisons(&self) -> usize {
        self.groups.iter().map(FeatureGroup::comparisons).sum()
    }
}

/// Builder for hand-written configurations
#[derive(Debug, Clone)]
pub struct ConfigurationBuilder {
    n_features: usize,
    groups: Vec<FeatureGroup>,
    positive_levels: BTreeMap<usize, u32>,
    frequencies: BTreeMap<usize, FrequencyTable>,
    unseen_policy: UnseenCategoryPolicy,
}

impl ConfigurationBuilder {
    pub fn new(n_features: usize) -> Self {
        Self {
            n_features,
            groups: Vec::new(),
            positive_levels: BTreeMap::new(),
            frequencies: BTreeMap::new(),
            unseen_policy: UnseenCategoryPolicy::default(),
        }
    }

    /// Add a feature group
    pub fn group(mut self, family: KernelFamily, features: Vec<usize>) -> Self {
        self.groups.push(FeatureGroup::new(family, features));
        self
    }

    /// Level coded as 1 for a categorical Jaccard member
    pub fn positive_level(mut self, index: usize, level: u32) -> Self {
        self.positive_levels.insert(index, level);
        self
    }

    /// Category probabilities of a univariate feature
    pub fn frequency_table(mut self, index: usize, table: FrequencyTable) -> Self {
        self.frequencies.insert(index, table);
        self
    }

    pub fn unseen_policy(mut self, policy: UnseenCategoryPolicy) -> Self {
        self.unseen_policy = policy;
        self
    }

    pub fn build(self) -> Result<FeatureConfiguration> {
        let config = FeatureConfiguration {
            n_features: self.n_features,
            groups: self.groups,
            positive_levels: self.positive_levels,
            frequencies: self.frequencies,
            unseen_policy: self.unseen_policy,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FeatureValue, Record};
    use approx::assert_relative_eq;

    fn mixed_samples() -> (FeatureSchema, Vec<Sample>) {
        let schema = FeatureSchema::from_types(&[
            FeatureType::Continuous,
            FeatureType::Categorical,
            FeatureType::Continuous,
            FeatureType::Categorical,
        ]);
        let rows = [
            (38.1, 1, 66.0, 1),
            (37.4, 2, 88.0, 2),
            (39.0, 1, 40.0, 3),
            (38.3, 2, 164.0, 3),
        ];
        let samples = rows
            .iter()
            .enumerate()
            .map(|(i, &(t, s, p, pain))| {
                Sample::new(
                    Record::new(vec![
                        FeatureValue::Numeric(t),
                        FeatureValue::Categorical(s),
                        FeatureValue::Numeric(p),
                        FeatureValue::Categorical(pain),
                    ]),
                    (i % 2) as f64,
                )
            })
            .collect();
        (schema, samples)
    }

    #[test]
    fn test_kernel_family_parsing() {
        assert_eq!("rbf".parse::<KernelFamily>().unwrap(), KernelFamily::Rbf);
        assert_eq!(" Jaccard ".parse::<KernelFamily>().unwrap(), KernelFamily::Jaccard);
        assert_eq!(
            "UNIVARIATE".parse::<KernelFamily>().unwrap(),
            KernelFamily::Univariate
        );
        assert_eq!(KernelFamily::Linear.to_string(), "linear");

        let err = "polynomial".parse::<KernelFamily>().unwrap_err();
        assert!(matches!(err, SVMError::UnrecognizedKernel(ref tag) if tag == "polynomial"));
    }

    #[test]
    fn test_unknown_family_in_serialized_config() {
        let json = r#"{"n_features":1,"groups":[{"family":"sigmoid","features":[0]}],
                       "positive_levels":{},"frequencies":{}}"#;
        assert!(serde_json::from_str::<FeatureConfiguration>(json).is_err());
    }

    #[test]
    fn test_from_training_assigns_groups() {
        let (schema, samples) = mixed_samples();
        let config =
            FeatureConfiguration::from_training(&schema, &samples, UnseenCategoryPolicy::Reject)
                .unwrap();

        assert_eq!(config.n_features(), 4);
        assert_eq!(config.family_of(0), Some(KernelFamily::Rbf));
        assert_eq!(config.family_of(2), Some(KernelFamily::Rbf));
        assert_eq!(config.family_of(1), Some(KernelFamily::Jaccard));
        assert_eq!(config.family_of(3), Some(KernelFamily::Univariate));
        assert_eq!(config.family_of(4), None);

        assert_eq!(config.groups().len(), 3);
        assert_eq!(config.groups()[0].features, vec![0, 2]);
        assert_eq!(config.n_comparisons(), 3);
        assert_eq!(config.positive_level(1), Some(1));
    }

    #[test]
    fn test_from_training_frequency_tables() {
        let (schema, samples) = mixed_samples();
        let config =
            FeatureConfiguration::from_training(&schema, &samples, UnseenCategoryPolicy::Pseudocount)
                .unwrap();

        let table = config.frequency_table(3).expect("univariate table");
        assert_eq!(table.total(), 4);
        assert_relative_eq!(table.probability(1).unwrap(), 0.25);
        assert_relative_eq!(table.probability(3).unwrap(), 0.5);
        let sum: f64 = table.levels().filter_map(|l| table.probability(l)).sum();
        assert_relative_eq!(sum, 1.0);

        assert!(config.frequency_table(1).is_none());
        assert_eq!(config.unseen_policy(), UnseenCategoryPolicy::Pseudocount);
    }

    #[test]
    fn test_from_training_counts_each_univariate_feature() {
        let schema = FeatureSchema::from_types(&[FeatureType::Categorical, FeatureType::Categorical]);
        let samples: Vec<Sample> = (0..6)
            .map(|i| Sample::new(Record::categorical(&[1 + i % 3, 1 + (i + 1) % 4]), 0.0))
            .collect();
        let config =
            FeatureConfiguration::from_training(&schema, &samples, UnseenCategoryPolicy::Reject)
                .unwrap();

        assert_eq!(config.groups().len(), 1);
        assert_eq!(config.groups()[0].family, KernelFamily::Univariate);
        assert_eq!(config.n_comparisons(), 2);
    }

    #[test]
    fn test_from_training_rejects_bad_input() {
        let (schema, mut samples) = mixed_samples();
        assert!(matches!(
            FeatureConfiguration::from_training(&schema, &[], UnseenCategoryPolicy::Reject),
            Err(SVMError::EmptyDataset)
        ));

        samples[2].record = Record::numeric(&[1.0, 2.0, 3.0, 4.0]);
        assert!(matches!(
            FeatureConfiguration::from_training(&schema, &samples, UnseenCategoryPolicy::Reject),
            Err(SVMError::InvalidFeature { index: 1, .. })
        ));
    }

    #[test]
    fn test_builder_linear_group() {
        let config = FeatureConfiguration::builder(3)
            .group(KernelFamily::Linear, vec![0, 1])
            .group(KernelFamily::Rbf, vec![2])
            .build()
            .unwrap();
        assert_eq!(config.family_of(1), Some(KernelFamily::Linear));
        assert_eq!(config.n_comparisons(), 2);
    }

    #[test]
    fn test_builder_rejects_invalid_assignments() {
        let duplicate = FeatureConfiguration::builder(2)
            .group(KernelFamily::Rbf, vec![0, 1])
            .group(KernelFamily::Jaccard, vec![1])
            .build();
        assert!(matches!(duplicate, Err(SVMError::InvalidParameter(_))));

        let uncovered = FeatureConfiguration::builder(3)
            .group(KernelFamily::Rbf, vec![0, 1])
            .build();
        assert!(matches!(uncovered, Err(SVMError::InvalidParameter(_))));

        let out_of_range = FeatureConfiguration::builder(1)
            .group(KernelFamily::Rbf, vec![0, 1])
            .build();
        assert!(matches!(out_of_range, Err(SVMError::InvalidParameter(_))));

        let misplaced_table = FeatureConfiguration::builder(1)
            .group(KernelFamily::Rbf, vec![0])
            .frequency_table(0, FrequencyTable::from_values(vec![1, 2, 3]).unwrap())
            .build();
        assert!(matches!(misplaced_table, Err(SVMError::InvalidParameter(_))));

        let empty = FeatureConfiguration::builder(0).build();
        assert!(matches!(empty, Err(SVMError::InvalidParameter(_))));
    }

    #[test]
    fn test_configuration_roundtrip_json() {
        let (schema, samples) = mixed_samples();
        let config =
            FeatureConfiguration::from_training(&schema, &samples, UnseenCategoryPolicy::Reject)
                .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: FeatureConfiguration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(back.validate().is_ok());
    }
}
