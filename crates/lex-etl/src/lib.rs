//! Tabular ETL Preprocessing Library
//!
//! Turns a mixed-type table into a dense, fully numeric feature matrix, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! - **Classification**: every column is tagged numeric or categorical once
//! - **Numeric stage**: mean imputation, then standardization to zero mean and unit variance
//! - **Categorical stage**: missing values become a `"missing"` category, then one-hot encoding
//! - **Assembly**: numeric features first, then indicators, with stable names and order
//! - **Fit/apply split**: parameters learned on one table can transform another
//! - **Progress Reporting**: per-stage and per-column updates through an injected reporter
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_etl::{Pipeline, io};
//!
//! let df = io::read_table("input_data.csv")?;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(df)?;
//!
//! println!("{} features", result.summary.output_columns);
//! io::write_table(&mut result.features.into_frame()?, "output/processed_data.csv")?;
//! ```
//!
//! # Fitting once, applying many times
//!
//! ```rust,ignore
//! use lex_etl::{FittedModel, Pipeline};
//!
//! let pipeline = Pipeline::builder().build()?;
//! let model = pipeline.fit(&train)?;
//! model.save("model.json")?;
//!
//! let model = FittedModel::load("model.json")?;
//! let features = pipeline.apply(&model, &new_rows)?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use lex_etl::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .empty_column_policy(EmptyColumnPolicy::Categorical) // empty column -> one indicator
//!     .missing_token("NA")
//!     .feature_separator("=")
//!     .parallel(false)
//!     .build()?;
//! ```

pub mod assembler;
pub mod categorical;
pub mod classifier;
pub mod config;
pub mod error;
pub mod io;
pub mod model;
pub mod numeric;
pub mod pipeline;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use assembler::FeatureAssembler;
pub use categorical::{CategoricalParams, CategoricalStage};
pub use classifier::ColumnClassifier;
pub use config::{ConfigValidationError, EmptyColumnPolicy, PipelineConfig, PipelineConfigBuilder};
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use io::{read_table, sample_dataset, write_table};
pub use model::FittedModel;
pub use numeric::{NumericParams, NumericStage};
pub use pipeline::{
    ClosureProgressReporter, Pipeline, PipelineBuilder, PipelineStage, ProgressReporter,
    ProgressUpdate, TransformState,
};
pub use types::{
    ClassifiedColumns, ColumnGroup, ColumnKind, FeatureTable, PipelineResult, StageOutput,
    TransformSummary,
};
pub use utils::{DtypeCategory, get_dtype_category, is_numeric_dtype};
