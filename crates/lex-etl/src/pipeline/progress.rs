//! Progress reporting for the preprocessing pipeline.
//!
//! The pipeline never logs progress to a global sink on its own behalf; callers
//! inject a [`ProgressReporter`] (or a closure) and receive [`ProgressUpdate`]s.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_etl::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:?}/{:?}] {}", update.state, update.stage, update.message);
//!     })
//!     .build()?
//!     .process(df);
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle of a single transform run.
///
/// `Idle → Classified → Transformed`, with any state able to move to `Failed`.
/// A failed run produces no output and is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformState {
    /// Nothing has happened yet
    Idle,
    /// Every column has a kind
    Classified,
    /// The feature table is assembled
    Transformed,
    /// A stage failed; the run is over
    Failed,
}

impl TransformState {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: TransformState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Classified)
                | (Self::Classified, Self::Transformed)
                | (Self::Idle | Self::Classified, Self::Failed)
        )
    }

    /// Whether the run has ended, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Transformed | Self::Failed)
    }
}

/// Stages of the preprocessing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Assigning a kind to every column
    Classification,
    /// Learning means, deviations and vocabularies
    Fitting,
    /// Imputing and standardizing numeric columns
    NumericTransform,
    /// Imputing and one-hot encoding categorical columns
    CategoricalTransform,
    /// Joining stage outputs into one table
    Assembly,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Classification => "Classifying Columns",
            Self::Fitting => "Fitting Parameters",
            Self::NumericTransform => "Transforming Numeric Columns",
            Self::CategoricalTransform => "Encoding Categorical Columns",
            Self::Assembly => "Assembling Features",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Returns the typical weight of this stage in the overall pipeline (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Classification => 0.05,
            Self::Fitting => 0.25,
            Self::NumericTransform => 0.30,
            Self::CategoricalTransform => 0.30,
            Self::Assembly => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Returns the cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Classification => 0.0,
            Self::Fitting => 0.05,
            Self::NumericTransform => 0.30,
            Self::CategoricalTransform => 0.60,
            Self::Assembly => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }

    /// The run state while this stage executes.
    pub fn state(&self) -> TransformState {
        match self {
            Self::Classification => TransformState::Idle,
            Self::Fitting
            | Self::NumericTransform
            | Self::CategoricalTransform
            | Self::Assembly => TransformState::Classified,
            Self::Complete => TransformState::Transformed,
            Self::Failed => TransformState::Failed,
        }
    }
}

/// Progress update emitted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: PipelineStage,

    /// Run state while the stage executes
    pub state: TransformState,

    /// Column being processed, for per-column updates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    /// Human-readable message describing current activity
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage.
    pub fn new(stage: PipelineStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            state: stage.state(),
            column: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a per-column progress update with item counts.
    pub fn with_items(
        stage: PipelineStage,
        column: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let mut update = Self::new(stage, stage_progress, message);
        update.column = Some(column.into());
        update.items_processed = Some(current);
        update.items_total = Some(total);
        update
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Complete, 1.0, message)
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(PipelineStage::Failed, 0.0, message)
    }
}

/// Trait for receiving progress updates during preprocessing.
///
/// Implementations must be `Send + Sync`: with parallel processing enabled,
/// per-column updates arrive from rayon worker threads.
///
/// # Example
///
/// ```rust,ignore
/// use lex_etl::{ProgressReporter, ProgressUpdate};
///
/// struct StderrReporter;
///
/// impl ProgressReporter for StderrReporter {
///     fn report(&self, update: ProgressUpdate) {
///         eprintln!("{:>5.1}% {}", update.progress * 100.0, update.message);
///     }
/// }
/// ```
pub trait ProgressReporter: Send + Sync {
    /// Called when progress is made during preprocessing.
    ///
    /// Called once per column per stage, so implementations should be cheap.
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(TransformState: Send, Sync, Copy);
