//! CLI entry point for the ETL preprocessing pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_etl::{
    EmptyColumnPolicy, FeatureTable, FittedModel, Pipeline, PipelineConfig, PreprocessingError,
    TransformSummary, io,
};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error, info};

/// CLI-compatible policy for columns with no values at all
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliEmptyColumns {
    /// Treat as numeric (the run fails: there is no mean to impute)
    Numeric,
    /// Treat as categorical (encoded as a single "missing" indicator)
    Categorical,
}

impl From<CliEmptyColumns> for EmptyColumnPolicy {
    fn from(cli: CliEmptyColumns) -> Self {
        match cli {
            CliEmptyColumns::Numeric => EmptyColumnPolicy::Numeric,
            CliEmptyColumns::Categorical => EmptyColumnPolicy::Categorical,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Tabular ETL preprocessing: impute, standardize and one-hot encode",
    long_about = "Reads a table, imputes missing values, standardizes numeric columns,\n\
                  one-hot encodes categorical columns and writes the feature matrix as CSV.\n\n\
                  EXAMPLES:\n  \
                  # Fit and transform, creating a sample input if absent\n  \
                  lex-etl -i input_data.csv -o output/processed_data.csv --create-sample\n\n  \
                  # Save the fitted parameters for later\n  \
                  lex-etl -i train.csv -o out/train.csv --model-out out/model.json\n\n  \
                  # Transform new data with saved parameters\n  \
                  lex-etl -i new.csv -o out/new.csv --model out/model.json"
)]
struct Args {
    /// Path to the input table (.csv or .parquet)
    #[arg(short, long, default_value = "input_data.csv")]
    input: String,

    /// Path of the CSV file to write the features to
    #[arg(short, long, default_value = "output/processed_data.csv")]
    output: String,

    /// Write the fitted model as JSON to this path
    #[arg(long, conflicts_with = "model")]
    model_out: Option<String>,

    /// Apply a previously saved model instead of fitting on the input
    #[arg(short, long)]
    model: Option<String>,

    /// How to classify columns that have no values at all
    #[arg(long, value_enum, default_value = "numeric")]
    empty_columns: CliEmptyColumns,

    /// Category used in place of missing categorical values
    #[arg(long, default_value = lex_etl::config::DEFAULT_MISSING_TOKEN)]
    missing_token: String,

    /// Separator between column name and category in indicator names
    #[arg(long, default_value = lex_etl::config::DEFAULT_FEATURE_SEPARATOR)]
    separator: String,

    /// Process columns on a single thread
    #[arg(long)]
    sequential: bool,

    /// Write a small sample dataset to the input path if it does not exist
    #[arg(long)]
    create_sample: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// What a run produced, printed at the end.
#[derive(Debug, Serialize)]
struct RunReport {
    input: String,
    output: String,
    rows: usize,
    feature_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_path: Option<String>,
    /// Row count of the table the model was fitted on.
    fitted_rows: usize,
    /// Only present when the model was fitted in this run.
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<TransformSummary>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    match run(&args) {
        Ok(report) => print_report(&report, args.json),
        Err(e) => {
            if args.json {
                if let Some(err) = e.downcast_ref::<PreprocessingError>() {
                    println!("{}", serde_json::json!({ "error": err }));
                }
            }
            error!("ETL pipeline failed: {:#}", e);
            Err(e)
        }
    }
}

fn run(args: &Args) -> Result<RunReport> {
    info!("Starting ETL pipeline");

    ensure_input(args)?;
    let data = io::read_table(&args.input)?;

    let config = PipelineConfig::builder()
        .empty_column_policy(args.empty_columns.into())
        .missing_token(&args.missing_token)
        .feature_separator(&args.separator)
        .parallel(!args.sequential)
        .build()?;

    let pipeline = Pipeline::builder()
        .config(config)
        .on_progress(|update| {
            debug!(
                "[{:>3.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        })
        .build()?;

    let (features, summary, model_path, fitted_rows) = match &args.model {
        Some(model_path) => {
            let model = FittedModel::load(model_path)?;
            info!(
                "Applying model from {} ({} features, fitted on {} rows)",
                model_path,
                model.n_features_out(),
                model.fitted_rows
            );
            let features = pipeline.apply(&model, &data)?;
            (features, None, Some(model_path.clone()), model.fitted_rows)
        }
        None => {
            let result = pipeline.process(data)?;
            if let Some(path) = &args.model_out {
                result.model.save(path)?;
            }
            let fitted_rows = result.model.fitted_rows;
            (
                result.features,
                Some(result.summary),
                args.model_out.clone(),
                fitted_rows,
            )
        }
    };

    let report = RunReport {
        input: args.input.clone(),
        output: args.output.clone(),
        rows: features.height(),
        feature_names: features
            .column_names()
            .into_iter()
            .map(String::from)
            .collect(),
        model_path,
        fitted_rows,
        summary,
    };

    load(features, &args.output)?;
    info!("ETL pipeline completed successfully");
    Ok(report)
}

/// Make sure the input exists, writing the sample dataset if asked to.
fn ensure_input(args: &Args) -> Result<()> {
    let input = Path::new(&args.input);
    if input.exists() {
        return Ok(());
    }
    if !args.create_sample {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Creating sample data at {}", args.input);
    let mut sample = io::sample_dataset()?;
    io::write_table(&mut sample, input)?;
    Ok(())
}

fn load(features: FeatureTable, output: &str) -> Result<()> {
    let mut df: DataFrame = features.into_frame()?;
    io::write_table(&mut df, output)?;
    Ok(())
}

/// Print the run report.
///
/// Uses `println!` intentionally: this is the command's output, not a log line,
/// and it must be visible regardless of log level.
fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    println!("Input:    {}", report.input);
    println!("Output:   {}", report.output);
    match &report.model_path {
        Some(path) => println!("Model:    {} (fitted on {} rows)", path, report.fitted_rows),
        None => println!("Model:    fitted on {} rows", report.fitted_rows),
    }
    println!(
        "Features: {} rows x {} columns",
        report.rows,
        report.feature_names.len()
    );

    if let Some(summary) = &report.summary {
        println!(
            "Columns:  {} numeric, {} categorical",
            summary.numeric_columns, summary.categorical_columns
        );
        println!(
            "Imputed:  {} numeric, {} categorical",
            summary.numeric_values_imputed, summary.categorical_values_imputed
        );
        println!("Duration: {} ms", summary.duration_ms);
    }

    println!();
    for name in &report.feature_names {
        println!("  {}", name);
    }

    Ok(())
}
