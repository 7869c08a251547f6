//! mixsvm Command Line Interface
//!
//! Estimates the aggregate-kernel gamma and the SVM regularization C for
//! mixed continuous/categorical CSV data, trains and saves models, and
//! uses them for prediction and evaluation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use mixsvm::api::{Estimation, HyperParameters, MixedKernelSVM};
use mixsvm::config::{FeatureSchema, UnseenCategoryPolicy};
use mixsvm::core::{Dataset, Result, SVMError};
use mixsvm::data::MixedCSVDataset;
use mixsvm::persistence::SerializableModel;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "mixsvm")]
#[command(about = "SVM with an aggregate kernel for mixed continuous and categorical data")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate gamma and C without saving a model
    Estimate(EstimateArgs),
    /// Estimate parameters, train and save a model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labelled data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(Args)]
struct EstimationArgs {
    /// Training data (CSV, label in the last column)
    #[arg(long)]
    data: PathBuf,

    /// Feature schema (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Candidate C values for cross-validation
    #[arg(long, value_delimiter = ',', default_value = "0.01,0.1,1,10,100")]
    c_grid: Vec<f64>,

    /// Number of cross-validation folds
    #[arg(long, default_value = "5")]
    folds: usize,

    /// Seed of the fold assignment
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Fixed gamma (skips gamma estimation)
    #[arg(long)]
    gamma: Option<f64>,

    /// Fixed regularization parameter C (skips cross-validation)
    #[arg(short = 'C', long = "c")]
    c: Option<f64>,

    /// Convergence tolerance
    #[arg(short, long, default_value = "0.001")]
    epsilon: f64,

    /// Maximum solver iterations
    #[arg(short, long, default_value = "100000")]
    max_iterations: usize,

    /// Kernel cache size in MB (used with --no-precompute)
    #[arg(long, default_value = "100")]
    cache_size: usize,

    /// Handling of categories never seen in training
    #[arg(long, default_value = "reject")]
    unseen: CliUnseenPolicy,

    /// Evaluate the kernel lazily in the final fit
    #[arg(long)]
    no_precompute: bool,
}

#[derive(ValueEnum, Clone, Debug)]
enum CliUnseenPolicy {
    /// Fail on unseen categories
    #[value(name = "reject")]
    Reject,
    /// Give unseen categories probability 1/(n+1)
    #[value(name = "pseudocount")]
    Pseudocount,
}

impl From<CliUnseenPolicy> for UnseenCategoryPolicy {
    fn from(cli_policy: CliUnseenPolicy) -> Self {
        match cli_policy {
            CliUnseenPolicy::Reject => UnseenCategoryPolicy::Reject,
            CliUnseenPolicy::Pseudocount => UnseenCategoryPolicy::Pseudocount,
        }
    }
}

impl EstimationArgs {
    fn builder(&self) -> MixedKernelSVM {
        let mut svm = MixedKernelSVM::new()
            .with_c_candidates(self.c_grid.clone())
            .with_folds(self.folds)
            .with_seed(self.seed)
            .with_epsilon(self.epsilon)
            .with_max_iterations(self.max_iterations)
            .with_cache_size(self.cache_size * 1024 * 1024) // Convert MB to bytes
            .with_unseen_category_policy(self.unseen.clone().into())
            .with_precompute(!self.no_precompute);
        if let Some(gamma) = self.gamma {
            svm = svm.with_gamma(gamma);
        }
        if let Some(c) = self.c {
            svm = svm.with_c(c);
        }
        svm
    }

    fn load(&self) -> Result<(FeatureSchema, MixedCSVDataset)> {
        let schema = FeatureSchema::from_file(&self.schema)?;
        let dataset = MixedCSVDataset::from_file(&self.data, &schema)?;
        info!(
            "Loaded {} records with {} features",
            dataset.len(),
            dataset.dim()
        );
        Ok((schema, dataset))
    }
}

#[derive(Args)]
struct EstimateArgs {
    #[command(flatten)]
    estimation: EstimationArgs,

    /// Write the training Gram matrix (JSON) to this file
    #[arg(long)]
    gram_output: Option<PathBuf>,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    estimation: EstimationArgs,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file (CSV; the label column may hold any number)
    #[arg(long)]
    data: PathBuf,

    /// Feature schema (JSON)
    #[arg(long)]
    schema: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show decision values
    #[arg(long)]
    confidence: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Labelled test data file
    #[arg(long)]
    data: PathBuf,

    /// Feature schema (JSON)
    #[arg(long)]
    schema: PathBuf,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Estimate(args) => estimate_command(args),
        Commands::Train(args) => train_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn estimate_command(args: EstimateArgs) -> Result<()> {
    let (schema, dataset) = args.estimation.load()?;
    let estimation = args.estimation.builder().estimate(&schema, &dataset.samples())?;

    print_estimation(&estimation);

    if let Some(path) = &args.gram_output {
        let gram = estimation.gram.as_ref().ok_or_else(|| {
            SVMError::MissingParameter("Gram matrix was not computed".to_string())
        })?;
        let file = File::create(path).map_err(SVMError::IoError)?;
        serde_json::to_writer(BufWriter::new(file), &**gram)
            .map_err(|e| SVMError::SerializationError(e.to_string()))?;
        info!("Gram matrix saved to: {path:?}");
    }

    Ok(())
}

fn print_estimation(estimation: &Estimation) {
    println!("=== Feature Configuration ===");
    for group in estimation.configuration.groups() {
        println!("  {:<10} {:?}", group.family.name(), group.features);
    }
    print_hyperparameters(&estimation.hyperparameters);
}

fn print_hyperparameters(hyper: &HyperParameters) {
    println!("=== Estimated Parameters ===");
    match &hyper.gamma_estimate {
        Some(estimate) => println!(
            "gamma: {:.6} (quartile distances {:.6} / {:.6} over {} pairs)",
            estimate.gamma, estimate.lower, estimate.upper, estimate.n_pairs
        ),
        None => println!("gamma: {:.6} (fixed)", hyper.gamma),
    }
    match &hyper.c_estimate {
        Some(estimate) => {
            println!("C: {}", estimate.c);
            if !estimate.scores.is_empty() {
                println!("  {:<12} {:>10}", "candidate", "CV error %");
                for score in &estimate.scores {
                    println!("  {:<12} {:>10.4}", score.c, score.error_percent);
                }
                if estimate.tied.len() > 1 {
                    println!("  tied candidates: {:?}", estimate.tied);
                }
                println!("  fold seed: {}", estimate.seed);
            }
        }
        None => println!("C: {} (fixed)", hyper.c),
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let (schema, dataset) = args.estimation.load()?;
    let samples = dataset.samples();

    if samples.len() < 2 {
        return Err(SVMError::InvalidDataset(
            "Dataset must contain at least 2 samples".to_string(),
        ));
    }

    let model = args.estimation.builder().fit(&schema, &samples)?;
    print_hyperparameters(model.hyperparameters());

    let serializable = SerializableModel::from_fitted(&model);
    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    let accuracy = model.accuracy(&samples)?;
    println!("Support records: {}", model.support_records().len());
    println!("Training accuracy: {:.2}%", accuracy * 100.0);

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = SerializableModel::load_from_file(&args.model)?.into_fitted()?;
    let schema = FeatureSchema::from_file(&args.schema)?;
    let dataset = MixedCSVDataset::from_file(&args.data, &schema)?;

    let predictions = model.predict_batch(&dataset.records())?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(SVMError::IoError)?)),
        None => Box::new(std::io::stdout().lock()),
    };

    writeln!(out, "# Predictions for {} samples", predictions.len()).map_err(SVMError::IoError)?;
    writeln!(
        out,
        "# Format: sample_index predicted_label{}",
        if args.confidence { " decision_value" } else { "" }
    )
    .map_err(SVMError::IoError)?;

    for (i, prediction) in predictions.iter().enumerate() {
        let written = if args.confidence {
            writeln!(out, "{} {} {:.6}", i, prediction.label, prediction.decision_value)
        } else {
            writeln!(out, "{} {}", i, prediction.label)
        };
        written.map_err(SVMError::IoError)?;
    }
    out.flush().map_err(SVMError::IoError)?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable = SerializableModel::load_from_file(&args.model)?;
    let model = serializable.clone().into_fitted()?;
    let schema = FeatureSchema::from_file(&args.schema)?;
    let dataset = MixedCSVDataset::from_file(&args.data, &schema)?;

    let metrics = model.evaluate(dataset.as_samples())?;

    println!("=== Model Evaluation ===");
    serializable.print_summary();

    println!("\nTest Results:");
    println!("  Samples: {}", metrics.n_samples);
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);
    println!(
        "  Misclassification rate: {:.2}%",
        metrics.misclassification_rate() * 100.0
    );

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let serializable = SerializableModel::load_from_file(&args.model)?;

    serializable.print_summary();

    println!("\nMachines:");
    for machine in serializable.model.machines() {
        println!(
            "  {} vs {}: {} support records, bias {:.6}",
            machine.positive,
            machine.negative,
            machine.support.len(),
            machine.bias
        );
    }

    Ok(())
}
