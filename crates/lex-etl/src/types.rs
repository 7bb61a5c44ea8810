//! Core data types shared across the preprocessing stages.

use crate::model::FittedModel;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind assigned to a column by the classifier.
///
/// Assigned once and carried through fitting and transformation; no later
/// stage re-inspects values to decide how a column is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric => write!(f, "numeric"),
            Self::Categorical => write!(f, "categorical"),
        }
    }
}

/// An ordered subset of a table's columns sharing one [`ColumnKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnGroup {
    pub kind: ColumnKind,
    pub columns: Vec<String>,
}

impl ColumnGroup {
    pub fn new(kind: ColumnKind) -> Self {
        Self {
            kind,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }
}

/// Result of classifying a table: two disjoint groups covering every column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedColumns {
    pub numeric: ColumnGroup,
    pub categorical: ColumnGroup,
    /// Every column with its kind, in the table's original order.
    pub assignments: Vec<(String, ColumnKind)>,
}

impl ClassifiedColumns {
    pub fn new() -> Self {
        Self {
            numeric: ColumnGroup::new(ColumnKind::Numeric),
            categorical: ColumnGroup::new(ColumnKind::Categorical),
            assignments: Vec::new(),
        }
    }

    /// Record a column under the given kind, preserving call order.
    pub fn push(&mut self, name: impl Into<String>, kind: ColumnKind) {
        let name = name.into();
        match kind {
            ColumnKind::Numeric => self.numeric.columns.push(name.clone()),
            ColumnKind::Categorical => self.categorical.columns.push(name.clone()),
        }
        self.assignments.push((name, kind));
    }

    /// Kind assigned to a column, if it was classified.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.assignments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, kind)| *kind)
    }

    pub fn total(&self) -> usize {
        self.assignments.len()
    }
}

impl Default for ClassifiedColumns {
    fn default() -> Self {
        Self::new()
    }
}

/// An ordered set of named `Float64` feature columns with no missing values.
///
/// The row count is stored explicitly so that a table with no columns (for
/// example the numeric output of a dataset without numeric columns) still
/// knows how many rows it stands for.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    height: usize,
    columns: Vec<Column>,
}

impl FeatureTable {
    /// Create a feature table from columns that all have `height` rows.
    pub fn new(height: usize, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == height));
        Self { height, columns }
    }

    /// A table with `height` rows and no columns.
    pub fn empty(height: usize) -> Self {
        Self {
            height,
            columns: Vec::new(),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name().as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name().as_str() == name)
    }

    /// Values of a column, or `None` if there is no such column.
    pub fn values(&self, name: &str) -> Option<Vec<f64>> {
        let column = self.column(name)?;
        let series = column.as_materialized_series();
        let values = series.f64().ok()?;
        Some(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }

    /// Total number of missing values left in the table.
    pub fn null_count(&self) -> usize {
        self.columns.iter().map(|c| c.null_count()).sum()
    }

    /// Build a polars `DataFrame` holding the same columns.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        DataFrame::new_with_height(self.height, self.columns.clone())
    }

    /// Consume the table into a polars `DataFrame`.
    pub fn into_frame(self) -> PolarsResult<DataFrame> {
        DataFrame::new_with_height(self.height, self.columns)
    }
}

/// Output of one transform stage along with what it had to repair.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub table: FeatureTable,
    /// Missing values that were filled.
    pub imputed: usize,
    /// Categorical values absent from the vocabulary (always 0 for numeric).
    pub unknown: usize,
}

/// Summary of a transform run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformSummary {
    /// Number of rows in the input (and output) table.
    pub rows: usize,
    /// Number of input columns classified numeric.
    pub numeric_columns: usize,
    /// Number of input columns classified categorical.
    pub categorical_columns: usize,
    /// Number of columns in the assembled output.
    pub output_columns: usize,
    /// Missing numeric values replaced with the column mean.
    pub numeric_values_imputed: usize,
    /// Missing categorical values replaced with the missing token.
    pub categorical_values_imputed: usize,
    /// Categorical values absent from the fitted vocabulary.
    pub unknown_categories: usize,
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    /// RFC 3339 timestamp of when the run finished.
    pub completed_at: String,
}

/// Result of a full fit-and-transform run.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// The assembled feature table.
    pub features: FeatureTable,
    /// Parameters fitted on the input, reusable with `Pipeline::apply`.
    pub model: FittedModel,
    pub summary: TransformSummary,
}
