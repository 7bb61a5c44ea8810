//! Feature assembly.
//!
//! Joins the numeric and categorical stage outputs into one feature table:
//! numeric columns first, in their original order, then the categorical
//! indicators in categorical column order and vocabulary order.

use crate::error::{PreprocessingError, Result};
use crate::types::FeatureTable;
use std::collections::HashSet;
use tracing::debug;

/// Merges stage outputs into the final feature table.
pub struct FeatureAssembler;

impl FeatureAssembler {
    /// Concatenate `numeric` and `categorical` column-wise.
    ///
    /// Fails with [`PreprocessingError::RowCountMismatch`] if the two tables
    /// disagree on row count, and with
    /// [`PreprocessingError::DuplicateFeatureName`] if a generated indicator
    /// name collides with another output column.
    pub fn assemble(numeric: FeatureTable, categorical: FeatureTable) -> Result<FeatureTable> {
        if numeric.height() != categorical.height() {
            return Err(PreprocessingError::RowCountMismatch {
                numeric: numeric.height(),
                categorical: categorical.height(),
            });
        }

        let height = numeric.height();
        let mut columns = numeric.into_columns();
        columns.extend(categorical.into_columns());

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name().as_str()) {
                return Err(PreprocessingError::DuplicateFeatureName(
                    column.name().to_string(),
                ));
            }
        }

        debug!("Assembled {} feature columns over {} rows", columns.len(), height);
        Ok(FeatureTable::new(height, columns))
    }
}
