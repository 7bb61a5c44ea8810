//! Main preprocessing pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder for
//! orchestrating classification, fitting and the two transform stages.

use crate::assembler::FeatureAssembler;
use crate::categorical::CategoricalStage;
use crate::classifier::ColumnClassifier;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{PreprocessingError, Result};
use crate::model::FittedModel;
use crate::numeric::NumericStage;
use crate::pipeline::progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate, TransformState,
};
use crate::types::{
    ClassifiedColumns, FeatureTable, PipelineResult, StageOutput, TransformSummary,
};
use polars::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// The main preprocessing pipeline.
///
/// Use [`Pipeline::builder()`] to create a new pipeline with custom configuration.
///
/// A pipeline holds no per-run state, so one instance can be reused for any
/// number of `fit`/`apply`/`process` calls, including from several threads.
///
/// # Example
///
/// ```rust,ignore
/// use lex_etl::{Pipeline, PipelineConfig};
///
/// // Fit and transform in one go
/// let result = Pipeline::builder()
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(dataframe)?;
///
/// // Fit on training data, apply the same parameters to new data
/// let pipeline = Pipeline::builder().config(PipelineConfig::default()).build()?;
/// let model = pipeline.fit(&train)?;
/// let features = pipeline.apply(&model, &test)?;
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    classifier: ColumnClassifier,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

/// Tracks the state of one run and enforces the legal transitions.
struct TransformRun {
    state: TransformState,
}

impl TransformRun {
    fn new() -> Self {
        Self {
            state: TransformState::Idle,
        }
    }

    fn advance(&mut self, next: TransformState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Transform state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Counters collected while transforming.
struct Applied {
    features: FeatureTable,
    numeric_imputed: usize,
    categorical_imputed: usize,
    unknown: usize,
}

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// The configuration this pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Assign a kind to every column of `df`.
    pub fn classify(&self, df: &DataFrame) -> Result<ClassifiedColumns> {
        self.classifier.classify(df)
    }

    /// Learn per-column parameters from `df` without transforming it.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessingError::DegenerateColumn`] for a numeric column
    /// with no values, and propagates column read failures.
    pub fn fit(&self, df: &DataFrame) -> Result<FittedModel> {
        let mut run = TransformRun::new();
        let result = self.fit_internal(&mut run, df);
        self.finish(&mut run, result)
    }

    /// Transform `df` with a previously fitted model.
    ///
    /// Every column the model was fitted on must be present; extra columns are
    /// ignored. Categories not seen at fit time encode as all zeros.
    ///
    /// # Errors
    ///
    /// Returns [`PreprocessingError::ColumnNotFound`] if `df` lacks a fitted
    /// column and [`PreprocessingError::InvalidConfig`] if the model fails
    /// [`FittedModel::validate`]. No partial output is produced on error.
    pub fn apply(&self, model: &FittedModel, df: &DataFrame) -> Result<FeatureTable> {
        let mut run = TransformRun::new();
        let result = self.apply_internal(&mut run, model, df);
        let applied = self.finish(&mut run, result)?;
        debug_assert!(run.state.is_terminal());
        self.report_progress(ProgressUpdate::complete(format!(
            "Transformed {} rows into {} features",
            applied.features.height(),
            applied.features.width()
        )));
        Ok(applied.features)
    }

    /// Fit on `df` and transform it with the fitted parameters.
    ///
    /// Equivalent to `apply(&fit(&df)?, &df)`, with a summary of the run.
    pub fn process(&self, df: DataFrame) -> Result<PipelineResult> {
        let mut run = TransformRun::new();
        let result = self.process_internal(&mut run, df);
        let result = self.finish(&mut run, result)?;
        debug_assert!(run.state.is_terminal());
        self.report_progress(ProgressUpdate::complete("Pipeline completed successfully"));
        Ok(result)
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    /// Move a failed run to `Failed` and tell the reporter.
    fn finish<T>(&self, run: &mut TransformRun, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                run.advance(TransformState::Failed);
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report one finished column of a stage; safe to call from worker threads.
    fn column_reporter<'a>(
        &'a self,
        stage: PipelineStage,
        total: usize,
        done: &'a AtomicUsize,
    ) -> impl Fn(&str) + Sync + 'a {
        move |column: &str| {
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            self.report_progress(ProgressUpdate::with_items(
                stage,
                column,
                current,
                total,
                format!("{}: '{}'", stage.display_name(), column),
            ));
        }
    }

    fn classify_run(&self, run: &mut TransformRun, df: &DataFrame) -> Result<ClassifiedColumns> {
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Classification,
            0.0,
            format!("Classifying {} columns...", df.width()),
        ));

        let classified = self.classifier.classify(df)?;
        run.advance(TransformState::Classified);

        info!(
            "Classified {} columns: {} numeric, {} categorical",
            classified.total(),
            classified.numeric.len(),
            classified.categorical.len()
        );
        self.report_progress(ProgressUpdate::new(
            PipelineStage::Classification,
            1.0,
            format!(
                "{} numeric, {} categorical",
                classified.numeric.len(),
                classified.categorical.len()
            ),
        ));

        Ok(classified)
    }

    fn fit_internal(&self, run: &mut TransformRun, df: &DataFrame) -> Result<FittedModel> {
        info!("Fitting on {} rows x {} columns", df.height(), df.width());
        let classified = self.classify_run(run, df)?;
        self.fit_classified(df, &classified)
    }

    fn fit_classified(
        &self,
        df: &DataFrame,
        classified: &ClassifiedColumns,
    ) -> Result<FittedModel> {
        let total = classified.total();
        let done = AtomicUsize::new(0);
        let on_column = self.column_reporter(PipelineStage::Fitting, total, &done);

        let parallel = self.config.parallel;
        let missing_token = self.config.missing_token.as_str();
        let numeric_columns = &classified.numeric.columns;
        let categorical_columns = &classified.categorical.columns;

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Fitting,
            0.0,
            format!("Fitting {} columns...", total),
        ));

        let (numeric, categorical) = if parallel {
            let (numeric, categorical) = rayon::join(
                || NumericStage::fit(df, numeric_columns, true, &on_column),
                || CategoricalStage::fit(df, categorical_columns, missing_token, true, &on_column),
            );
            (numeric?, categorical?)
        } else {
            (
                NumericStage::fit(df, numeric_columns, false, &on_column)?,
                CategoricalStage::fit(df, categorical_columns, missing_token, false, &on_column)?,
            )
        };

        let model = FittedModel {
            numeric,
            categorical,
            missing_token: self.config.missing_token.clone(),
            feature_separator: self.config.feature_separator.clone(),
            fitted_rows: df.height(),
        };

        info!(
            "Fitted model: {} input columns -> {} features",
            model.numeric.len() + model.categorical.len(),
            model.n_features_out()
        );
        Ok(model)
    }

    fn apply_internal(
        &self,
        run: &mut TransformRun,
        model: &FittedModel,
        df: &DataFrame,
    ) -> Result<Applied> {
        model.validate()?;

        for name in model.input_columns() {
            if df.column(name).is_err() {
                return Err(PreprocessingError::ColumnNotFound(name.to_string()));
            }
        }
        let ignored: Vec<&str> = df
            .get_column_names()
            .into_iter()
            .map(|n| n.as_str())
            .filter(|n| model.kind_of(n).is_none())
            .collect();
        if !ignored.is_empty() {
            warn!(
                "Ignoring {} column(s) not seen at fit time: {:?}",
                ignored.len(),
                ignored
            );
        }

        // Kinds come from the model; nothing is re-inspected.
        run.advance(TransformState::Classified);
        self.transform(run, model, df)
    }

    fn transform(
        &self,
        run: &mut TransformRun,
        model: &FittedModel,
        df: &DataFrame,
    ) -> Result<Applied> {
        let parallel = self.config.parallel;
        let missing_token = model.missing_token.as_str();
        let separator = model.feature_separator.as_str();

        let numeric_done = AtomicUsize::new(0);
        let on_numeric = self.column_reporter(
            PipelineStage::NumericTransform,
            model.numeric.len(),
            &numeric_done,
        );
        let categorical_done = AtomicUsize::new(0);
        let on_categorical = self.column_reporter(
            PipelineStage::CategoricalTransform,
            model.categorical.len(),
            &categorical_done,
        );

        let run_numeric =
            |parallel: bool| NumericStage::transform(df, &model.numeric, parallel, &on_numeric);
        let run_categorical = |parallel: bool| {
            CategoricalStage::transform(
                df,
                &model.categorical,
                missing_token,
                separator,
                parallel,
                &on_categorical,
            )
        };

        // Both stages read the same input and write disjoint outputs.
        let (numeric, categorical): (StageOutput, StageOutput) = if parallel {
            let (numeric, categorical) =
                rayon::join(|| run_numeric(true), || run_categorical(true));
            (numeric?, categorical?)
        } else {
            let numeric = run_numeric(false)?;
            (numeric, run_categorical(false)?)
        };

        self.report_progress(ProgressUpdate::new(
            PipelineStage::Assembly,
            0.0,
            "Assembling feature table...",
        ));
        let features = FeatureAssembler::assemble(numeric.table, categorical.table)?;
        debug_assert_eq!(features.height(), df.height());
        debug_assert_eq!(features.null_count(), 0);

        run.advance(TransformState::Transformed);
        info!(
            "Transformed {} rows into {} features \
             ({} numeric imputed, {} categorical imputed, {} unknown)",
            features.height(),
            features.width(),
            numeric.imputed,
            categorical.imputed,
            categorical.unknown
        );

        Ok(Applied {
            features,
            numeric_imputed: numeric.imputed,
            categorical_imputed: categorical.imputed,
            unknown: categorical.unknown,
        })
    }

    fn process_internal(&self, run: &mut TransformRun, df: DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();
        info!(
            "Starting preprocessing pipeline on {} rows x {} columns",
            df.height(),
            df.width()
        );

        let classified = self.classify_run(run, &df)?;
        let model = self.fit_classified(&df, &classified)?;
        let applied = self.transform(run, &model, &df)?;

        let summary = TransformSummary {
            rows: df.height(),
            numeric_columns: classified.numeric.len(),
            categorical_columns: classified.categorical.len(),
            output_columns: applied.features.width(),
            numeric_values_imputed: applied.numeric_imputed,
            categorical_values_imputed: applied.categorical_imputed,
            unknown_categories: applied.unknown,
            duration_ms: start_time.elapsed().as_millis() as u64,
            completed_at: chrono::Local::now().to_rfc3339(),
        };

        info!("Pipeline finished in {} ms", summary.duration_ms);

        Ok(PipelineResult {
            features: applied.features,
            model,
            summary,
        })
    }
}

/// Builder for creating a [`Pipeline`] with custom configuration.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::builder()
///     .config(PipelineConfig::builder().parallel(false).build()?)
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?;
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use lex_etl::{ProgressReporter, ProgressUpdate};
    /// use std::sync::Arc;
    ///
    /// struct MyReporter;
    ///
    /// impl ProgressReporter for MyReporter {
    ///     fn report(&self, update: ProgressUpdate) {
    ///         println!("{}: {}", update.stage.display_name(), update.message);
    ///     }
    /// }
    ///
    /// let pipeline = Pipeline::builder()
    ///     .progress_reporter(Arc::new(MyReporter))
    ///     .build()?;
    /// ```
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// This is a convenience method for simple progress handling.
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Pipeline {
            classifier: ColumnClassifier::new(config.empty_column_policy),
            config,
            progress_reporter: self.progress_reporter,
        })
    }
}
