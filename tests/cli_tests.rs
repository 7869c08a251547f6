//! Integration tests for the CLI application
//!
//! These tests run the `mixsvm` binary against schema and CSV files.

use std::io::Write;
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

/// Helper to create test data files
struct TestDataFiles {
    pub schema_file: NamedTempFile,
    pub train_file: NamedTempFile,
    pub test_file: NamedTempFile,
}

impl TestDataFiles {
    fn new() -> std::io::Result<Self> {
        let mut schema_file = NamedTempFile::with_suffix(".json")?;
        write!(
            schema_file,
            r#"{{"features": [
                {{"name": "temperature", "type": "continuous"}},
                {{"name": "surgery", "type": "categorical"}},
                {{"name": "pain", "type": "categorical"}}
            ]}}"#
        )?;
        schema_file.flush()?;

        let mut train_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(train_file, "temperature,surgery,pain,outcome")?;
        for i in 0..16 {
            let positive = i % 2 == 0;
            let temperature = if positive { 2.0 } else { -2.0 } + (i as f64) * 0.05;
            let surgery = if positive { 1 } else { 2 };
            let pain = if positive { 1 + i % 4 / 2 } else { 3 + i % 4 / 2 };
            let label = if positive { 1 } else { 2 };
            writeln!(train_file, "{temperature},{surgery},{pain},{label}")?;
        }
        train_file.flush()?;

        let mut test_file = NamedTempFile::with_suffix(".csv")?;
        writeln!(test_file, "temperature,surgery,pain,outcome")?;
        writeln!(test_file, "2.1,1,1,1")?;
        writeln!(test_file, "-1.9,2,3,2")?;
        writeln!(test_file, "1.7,1,2,1")?;
        test_file.flush()?;

        Ok(TestDataFiles {
            schema_file,
            train_file,
            test_file,
        })
    }

    fn schema(&self) -> &str {
        self.schema_file.path().to_str().unwrap()
    }

    fn train(&self) -> &str {
        self.train_file.path().to_str().unwrap()
    }

    fn test(&self) -> &str {
        self.test_file.path().to_str().unwrap()
    }
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mixsvm"))
        .args(args)
        .output()
        .expect("Failed to run mixsvm")
}

fn train_model(data: &TestDataFiles, model_path: &str) {
    let output = run(&[
        "train",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--output",
        model_path,
        "--c-grid",
        "0.1,1,10",
        "--folds",
        "4",
    ]);
    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn test_cli_estimate_command() {
    let data = TestDataFiles::new().expect("Failed to create test data");

    let output = run(&[
        "estimate",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--c-grid",
        "0.5,5",
        "--folds",
        "4",
        "--seed",
        "7",
    ]);

    assert!(
        output.status.success(),
        "Estimate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gamma:"));
    assert!(stdout.contains("quartile distances"));
    assert!(stdout.contains("CV error %"));
    assert!(stdout.contains("fold seed: 7"));
    assert!(stdout.contains("rbf"));
    assert!(stdout.contains("jaccard"));
    assert!(stdout.contains("univariate"));
}

#[test]
fn test_cli_estimate_writes_gram_matrix() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let gram_path = temp_dir.path().join("gram.json");

    let output = run(&[
        "estimate",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--gamma",
        "1.0",
        "-C",
        "1.0",
        "--gram-output",
        gram_path.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "Estimate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(fixed)"));

    let gram: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&gram_path).unwrap()).unwrap();
    assert_eq!(gram["n"], 16);
    assert_eq!(gram["values"].as_array().unwrap().len(), 16 * 16);
}

#[test]
fn test_cli_train_and_info() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    let model = model_path.to_str().unwrap();

    train_model(&data, model);
    assert!(model_path.exists(), "Model file was not created");

    let output = run(&["info", model]);
    assert!(
        output.status.success(),
        "Info command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Mixed-Kernel SVM Model Summary"));
    assert!(stdout.contains("Classes: [1.0, 2.0]"));
    assert!(stdout.contains("Binary machines: 1"));
    assert!(stdout.contains("2 vs 1"));
}

#[test]
fn test_cli_train_lazy_kernel() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");

    let output = run(&[
        "train",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--output",
        model_path.to_str().unwrap(),
        "-C",
        "1.0",
        "--no-precompute",
        "--cache-size",
        "1",
    ]);

    assert!(
        output.status.success(),
        "Train command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(String::from_utf8_lossy(&output.stdout).contains("Training accuracy: 100.00%"));
}

#[test]
fn test_cli_predict_command() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    let predictions_path = temp_dir.path().join("predictions.txt");
    train_model(&data, model_path.to_str().unwrap());

    let output = run(&[
        "predict",
        "--model",
        model_path.to_str().unwrap(),
        "--data",
        data.test(),
        "--schema",
        data.schema(),
        "--output",
        predictions_path.to_str().unwrap(),
    ]);

    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let predictions = std::fs::read_to_string(&predictions_path).unwrap();
    let labels: Vec<&str> = predictions
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.split_whitespace().nth(1).unwrap())
        .collect();
    assert_eq!(labels, vec!["1", "2", "1"]);
}

#[test]
fn test_cli_predict_with_confidence() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    train_model(&data, model_path.to_str().unwrap());

    let output = run(&[
        "predict",
        "--model",
        model_path.to_str().unwrap(),
        "--data",
        data.test(),
        "--schema",
        data.schema(),
        "--confidence",
    ]);

    assert!(
        output.status.success(),
        "Predict command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Predictions for 3 samples"));
    assert!(stdout.contains("decision_value"));
    for line in stdout.lines().filter(|line| !line.starts_with('#')) {
        assert_eq!(line.split_whitespace().count(), 3, "{line}");
    }
}

#[test]
fn test_cli_evaluate_command() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let model_path = temp_dir.path().join("model.json");
    train_model(&data, model_path.to_str().unwrap());

    let output = run(&[
        "evaluate",
        "--model",
        model_path.to_str().unwrap(),
        "--data",
        data.test(),
        "--schema",
        data.schema(),
    ]);

    assert!(
        output.status.success(),
        "Evaluate command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Samples: 3"));
    assert!(stdout.contains("Accuracy: 100.00%"));
    assert!(stdout.contains("Misclassification rate: 0.00%"));
}

#[test]
fn test_cli_error_handling_invalid_file() {
    let data = TestDataFiles::new().expect("Failed to create test data");

    let output = run(&[
        "estimate",
        "--data",
        "/nonexistent/file.csv",
        "--schema",
        data.schema(),
    ]);

    assert!(!output.status.success(), "Should fail with nonexistent file");
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error"));
}

#[test]
fn test_cli_error_handling_missing_values() {
    let data = TestDataFiles::new().expect("Failed to create test data");
    let mut incomplete = NamedTempFile::with_suffix(".csv").unwrap();
    writeln!(incomplete, "2.0,1,?,1").unwrap();
    writeln!(incomplete, "-2.0,2,3,2").unwrap();
    incomplete.flush().unwrap();

    let output = run(&[
        "estimate",
        "--data",
        incomplete.path().to_str().unwrap(),
        "--schema",
        data.schema(),
    ]);

    assert!(!output.status.success(), "Should reject missing values");
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing value"));
}

#[test]
fn test_cli_error_handling_too_many_folds() {
    let data = TestDataFiles::new().expect("Failed to create test data");

    let output = run(&[
        "estimate",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--folds",
        "50",
    ]);

    assert!(!output.status.success(), "Should fail with more folds than records");
}

#[test]
fn test_cli_invalid_unseen_policy() {
    let data = TestDataFiles::new().expect("Failed to create test data");

    let output = run(&[
        "estimate",
        "--data",
        data.train(),
        "--schema",
        data.schema(),
        "--unseen",
        "ignore",
    ]);

    assert!(!output.status.success(), "Should reject unknown policy");
}

#[test]
fn test_cli_verbose_and_debug_flags() {
    let data = TestDataFiles::new().expect("Failed to create test data");

    for flag in ["--verbose", "--debug"] {
        let output = run(&[
            flag,
            "estimate",
            "--data",
            data.train(),
            "--schema",
            data.schema(),
            "--gamma",
            "1.0",
            "-C",
            "1.0",
        ]);
        assert!(
            output.status.success(),
            "{flag} run failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_cli_help_output() {
    let output = run(&["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["estimate", "train", "predict", "evaluate", "info"] {
        assert!(stdout.contains(command), "help is missing {command}");
    }
}

#[test]
fn test_cli_version_output() {
    let output = run(&["--version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}
