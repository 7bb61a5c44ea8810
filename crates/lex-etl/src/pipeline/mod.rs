//! Pipeline module.
//!
//! This module provides the main preprocessing pipeline and its progress reporting.

mod builder;
pub mod progress;

pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{
    ClosureProgressReporter, PipelineStage, ProgressReporter, ProgressUpdate, TransformState,
};
