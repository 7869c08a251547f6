//! Categorical frequency tables for the univariate kernel

use crate::core::{Result, SVMError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to do with a category that never appeared in training data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnseenCategoryPolicy {
    /// Fail with `SVMError::UnseenCategory`
    #[default]
    Reject,
    /// Use probability 1 / (n_train + 1)
    Pseudocount,
}

/// Empirical probability of each category of one feature
///
/// Built from training data only and never refreshed from test data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    probabilities: BTreeMap<u32, f64>,
    total: usize,
}

impl FrequencyTable {
    /// Count category values and turn counts into relative frequencies
    pub fn from_values<I: IntoIterator<Item = u32>>(values: I) -> Result<Self> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        let mut total = 0;
        for value in values {
            *counts.entry(value).or_insert(0) += 1;
            total += 1;
        }

        if total == 0 {
            return Err(SVMError::EmptyDataset);
        }

        let probabilities = counts
            .into_iter()
            .map(|(value, count)| (value, count as f64 / total as f64))
            .collect();

        Ok(Self {
            probabilities,
            total,
        })
    }

    /// Use externally estimated probabilities
    ///
    /// `total` is the number of records the probabilities were estimated
    /// from; it drives the pseudocount for unseen categories.
    pub fn from_probabilities(probabilities: BTreeMap<u32, f64>, total: usize) -> Result<Self> {
        let table = Self {
            probabilities,
            total,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check the table is a proper distribution
    pub fn validate(&self) -> Result<()> {
        if self.probabilities.is_empty() || self.total == 0 {
            return Err(SVMError::EmptyDataset);
        }
        if let Some((value, p)) = self
            .probabilities
            .iter()
            .find(|(_, &p)| !(0.0..=1.0).contains(&p))
        {
            return Err(SVMError::InvalidParameter(format!(
                "Probability of category {value} must lie in [0, 1], got {p}"
            )));
        }
        let sum: f64 = self.probabilities.values().sum();
        if (sum - 1.0).abs() > 1e-9 {
            return Err(SVMError::InvalidParameter(format!(
                "Category probabilities must sum to 1, got {sum}"
            )));
        }
        Ok(())
    }

    /// Probability of a category, if it was observed
    pub fn probability(&self, value: u32) -> Option<f64> {
        self.probabilities.get(&value).copied()
    }

    /// Probability of a category with the unseen-category policy applied
    pub fn resolve(&self, feature: usize, value: u32, policy: UnseenCategoryPolicy) -> Result<f64> {
        match (self.probability(value), policy) {
            (Some(p), _) => Ok(p),
            (None, UnseenCategoryPolicy::Reject) => {
                Err(SVMError::UnseenCategory { feature, value })
            }
            (None, UnseenCategoryPolicy::Pseudocount) => Ok(1.0 / (self.total + 1) as f64),
        }
    }

    /// Number of records the table was estimated from
    pub fn total(&self) -> usize {
        self.total
    }

    /// Observed categories in ascending order
    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.probabilities.keys().copied()
    }

    /// Number of observed categories
    pub fn cardinality(&self) -> usize {
        self.probabilities.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_values() {
        let table = FrequencyTable::from_values(vec![1, 2, 2, 3, 3, 3]).unwrap();
        assert_eq!(table.total(), 6);
        assert_eq!(table.cardinality(), 3);
        assert_eq!(table.levels().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_relative_eq!(table.probability(1).unwrap(), 1.0 / 6.0);
        assert_relative_eq!(table.probability(2).unwrap(), 2.0 / 6.0);
        assert_relative_eq!(table.probability(3).unwrap(), 3.0 / 6.0);
        assert_eq!(table.probability(4), None);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_from_values_empty() {
        let result = FrequencyTable::from_values(Vec::<u32>::new());
        assert!(matches!(result, Err(SVMError::EmptyDataset)));
    }

    #[test]
    fn test_from_probabilities_validation() {
        let mut probs = BTreeMap::new();
        probs.insert(1, 0.25);
        probs.insert(2, 0.75);
        assert!(FrequencyTable::from_probabilities(probs.clone(), 4).is_ok());

        probs.insert(3, 0.5);
        assert!(matches!(
            FrequencyTable::from_probabilities(probs, 4),
            Err(SVMError::InvalidParameter(_))
        ));

        let mut negative = BTreeMap::new();
        negative.insert(1, -0.5);
        negative.insert(2, 1.5);
        assert!(FrequencyTable::from_probabilities(negative, 2).is_err());
    }

    #[test]
    fn test_resolve_policies() {
        let table = FrequencyTable::from_values(vec![1, 1, 2, 3]).unwrap();

        assert_relative_eq!(
            table.resolve(5, 1, UnseenCategoryPolicy::Reject).unwrap(),
            0.5
        );
        assert!(matches!(
            table.resolve(5, 9, UnseenCategoryPolicy::Reject),
            Err(SVMError::UnseenCategory {
                feature: 5,
                value: 9
            })
        ));
        assert_relative_eq!(
            table.resolve(5, 9, UnseenCategoryPolicy::Pseudocount).unwrap(),
            0.2
        );
    }

    #[test]
    fn test_serialization_keeps_integer_keys() {
        let table = FrequencyTable::from_values(vec![4, 7, 7, 7]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let back: FrequencyTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(UnseenCategoryPolicy::default(), UnseenCategoryPolicy::Reject);
    }
}
