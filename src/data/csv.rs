//! CSV reader for mixed-type records
//!
//! Columns follow the feature schema in order, with the outcome label in
//! the last column:
//! - continuous cells are real numbers
//! - categorical cells are positive integer category codes
//! - a header row is detected and skipped
//! - blank lines and `#` comments are ignored
//!
//! Missing values (`?` or an empty cell) are rejected; imputation happens
//! before the data reaches this crate.

use crate::config::{FeatureSchema, FeatureType};
use crate::core::{Dataset, FeatureValue, Record, Result, SVMError, Sample};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Labelled records read from a CSV file
#[derive(Debug, Clone)]
pub struct MixedCSVDataset {
    samples: Vec<Sample>,
    dimensions: usize,
    header: Option<Vec<String>>,
}

impl MixedCSVDataset {
    /// Wrap samples already checked against a schema
    pub fn new(samples: Vec<Sample>, schema: &FeatureSchema) -> Result<Self> {
        for sample in &samples {
            schema.check_record(&sample.record)?;
        }
        Ok(Self {
            samples,
            dimensions: schema.len(),
            header: None,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P, schema: &FeatureSchema) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        Self::from_reader(BufReader::new(file), schema)
    }

    /// Read with header detection
    pub fn from_reader<R: BufRead>(reader: R, schema: &FeatureSchema) -> Result<Self> {
        Self::from_reader_with_options(reader, schema, true)
    }

    pub fn from_reader_with_options<R: BufRead>(
        reader: R,
        schema: &FeatureSchema,
        auto_detect_header: bool,
    ) -> Result<Self> {
        if schema.is_empty() {
            return Err(SVMError::InvalidParameter(
                "Schema must declare at least one feature".to_string(),
            ));
        }

        let mut samples = Vec::new();
        let mut header = None;
        let mut first_data_line = true;

        for (number, line) in reader.lines().enumerate() {
            let line = line.map_err(SVMError::IoError)?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first_data_line {
                first_data_line = false;
                if auto_detect_header && Self::is_header_line(line) {
                    header = Some(line.split(',').map(|f| f.trim().to_string()).collect());
                    continue;
                }
            }

            samples.push(Self::parse_data_line(line, number + 1, schema)?);
        }

        if samples.is_empty() {
            return Err(SVMError::EmptyDataset);
        }

        debug!("Read {} records of {} features", samples.len(), schema.len());
        Ok(Self {
            samples,
            dimensions: schema.len(),
            header,
        })
    }

    /// Column names, when the file had a header row
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn records(&self) -> Vec<Record> {
        self.samples.iter().map(|s| s.record.clone()).collect()
    }

    pub fn as_samples(&self) -> &[Sample] {
        &self.samples
    }

    /// A line is a header when most feature cells are not numbers
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 2 {
            return false;
        }
        let features = &fields[..fields.len() - 1];
        let non_numeric = features
            .iter()
            .filter(|f| !Self::is_missing(f) && f.parse::<f64>().is_err())
            .count();
        non_numeric * 2 > features.len()
    }

    fn is_missing(field: &str) -> bool {
        field.is_empty() || field == "?"
    }

    fn parse_data_line(line: &str, number: usize, schema: &FeatureSchema) -> Result<Sample> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != schema.len() + 1 {
            return Err(SVMError::ParseError(format!(
                "Line {number}: expected {} fields ({} features and a label), got {}",
                schema.len() + 1,
                schema.len(),
                fields.len()
            )));
        }

        let (label_field, feature_fields) = fields
            .split_last()
            .ok_or_else(|| SVMError::ParseError(format!("Line {number} is empty")))?;

        let values = feature_fields
            .iter()
            .zip(&schema.features)
            .enumerate()
            .map(|(column, (field, spec))| {
                if Self::is_missing(field) {
                    return Err(SVMError::ParseError(format!(
                        "Line {number}: missing value for '{}' (column {})",
                        spec.name,
                        column + 1
                    )));
                }
                match spec.kind {
                    FeatureType::Continuous => field.parse::<f64>().map(FeatureValue::Numeric).map_err(|_| {
                        SVMError::ParseError(format!(
                            "Line {number}: invalid number for '{}': {field}",
                            spec.name
                        ))
                    }),
                    FeatureType::Categorical => match field.parse::<u32>() {
                        Ok(code) if code > 0 => Ok(FeatureValue::Categorical(code)),
                        _ => Err(SVMError::ParseError(format!(
                            "Line {number}: category code for '{}' must be a positive integer, got: {field}",
                            spec.name
                        ))),
                    },
                }
            })
            .collect::<Result<Vec<FeatureValue>>>()?;

        if Self::is_missing(label_field) {
            return Err(SVMError::ParseError(format!("Line {number}: missing label")));
        }
        let label = label_field
            .parse::<f64>()
            .ok()
            .filter(|l| l.is_finite())
            .ok_or_else(|| SVMError::ParseError(format!("Line {number}: invalid label: {label_field}")))?;

        let record = Record::new(values);
        schema.check_record(&record)?;
        Ok(Sample::new(record, label))
    }
}

impl Dataset for MixedCSVDataset {
    fn len(&self) -> usize {
        self.samples.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn get_sample(&self, i: usize) -> Sample {
        self.samples[i].clone()
    }

    fn samples(&self) -> Vec<Sample> {
        self.samples.clone()
    }

    fn get_labels(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.label).collect()
    }
}
