//! Shared utilities for the preprocessing engine.
//!
//! Value extraction helpers used by the classifier and both transform stages,
//! plus the small amount of statistics the numeric stage needs.

use crate::error::{PreprocessingError, Result};
use polars::prelude::*;
use rayon::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for preprocessing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer, floating point or decimal numbers
    Numeric,
    /// String/text type
    String,
    /// Column holding nothing but nulls
    Null,
    /// Boolean, temporal, categorical and anything else
    Other,
}

/// Check if a DataType holds real numbers: any integer width, float or decimal.
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || dtype.is_decimal()
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if matches!(dtype, DataType::String) {
        DtypeCategory::String
    } else if matches!(dtype, DataType::Null) {
        DtypeCategory::Null
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Value Parsing
// =============================================================================

/// Parse a textual value as a finite real number.
///
/// Surrounding whitespace is ignored. `NaN` and infinities are rejected so that
/// a column classified numeric can always be standardized.
pub fn parse_numeric_value(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Count the non-missing values of a series.
///
/// Float `NaN` counts as missing, matching how [`numeric_values`] reads it.
pub fn present_count(series: &Series) -> usize {
    match series.dtype() {
        DataType::Float32 | DataType::Float64 => series
            .cast(&DataType::Float64)
            .ok()
            .and_then(|s| {
                s.f64()
                    .ok()
                    .map(|ca| ca.into_iter().flatten().filter(|v| !v.is_nan()).count())
            })
            .unwrap_or(0),
        _ => series.len() - series.null_count(),
    }
}

/// Read a column as optional `f64` values, `None` marking a missing entry.
///
/// Numeric dtypes are cast directly; `NaN` becomes `None`. String columns are
/// parsed with [`parse_numeric_value`]. A value that cannot be represented as
/// a finite real number is an error rather than a silent null.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    let column = series.name().to_string();

    match get_dtype_category(series.dtype()) {
        DtypeCategory::Numeric => {
            let casted = series.cast(&DataType::Float64)?;
            casted
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if x.is_nan() => Ok(None),
                    Some(x) if x.is_infinite() => Err(PreprocessingError::TypeConversionFailed {
                        column: column.clone(),
                        reason: format!("non-finite value {x}"),
                    }),
                    other => Ok(other),
                })
                .collect()
        }
        DtypeCategory::String => series
            .str()?
            .into_iter()
            .map(|v| match v {
                None => Ok(None),
                Some(raw) => parse_numeric_value(raw).map(Some).ok_or_else(|| {
                    PreprocessingError::TypeConversionFailed {
                        column: column.clone(),
                        reason: format!("'{raw}' is not a real number"),
                    }
                }),
            })
            .collect(),
        DtypeCategory::Null => Ok(vec![None; series.len()]),
        DtypeCategory::Other => Err(PreprocessingError::TypeConversionFailed {
            column,
            reason: format!("dtype {} cannot be read as numeric", series.dtype()),
        }),
    }
}

/// Read a column as its textual form, replacing missing entries with `fill`.
///
/// Returns the values plus the number of entries that were filled.
pub fn string_values(series: &Series, fill: &str) -> Result<(Vec<String>, usize)> {
    let column = series.name().to_string();

    // Float NaN is a missing marker, not a category.
    let series = if matches!(series.dtype(), DataType::Float32 | DataType::Float64) {
        let ca: Float64Chunked = series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        ca.with_name(series.name().clone()).into_series()
    } else {
        series.clone()
    };

    let casted = series
        .cast(&DataType::String)
        .map_err(|e| PreprocessingError::Encoding {
            column: column.clone(),
            reason: e.to_string(),
        })?;

    ensure_lossless_cast(
        &column,
        series.dtype(),
        series.null_count(),
        casted.null_count(),
    )?;

    let mut filled = 0;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| match v {
            Some(s) => s.to_string(),
            None => {
                filled += 1;
                fill.to_string()
            }
        })
        .collect();

    Ok((values, filled))
}

/// Fail if a cast to text turned present values into nulls.
///
/// Such values would otherwise be indistinguishable from genuinely missing
/// entries and silently land in the missing category.
fn ensure_lossless_cast(
    column: &str,
    dtype: &DataType,
    nulls_before: usize,
    nulls_after: usize,
) -> Result<()> {
    if nulls_after == nulls_before {
        return Ok(());
    }
    Err(PreprocessingError::Encoding {
        column: column.to_string(),
        reason: format!(
            "{} value(s) of dtype {} have no textual form",
            nulls_after.saturating_sub(nulls_before),
            dtype
        ),
    })
}

// =============================================================================
// Column Iteration
// =============================================================================

/// Apply `f` to every item, optionally on the rayon pool.
///
/// Results come back in input order either way. If any item fails the whole
/// call fails; with `parallel` set, which error wins is unspecified.
pub fn try_map_ordered<T, R, F>(items: &[T], parallel: bool, f: F) -> Result<Vec<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync + Send,
{
    if parallel {
        items.par_iter().map(&f).collect()
    } else {
        items.iter().map(f).collect()
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Arithmetic mean of a slice, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`), `None` when empty.
pub fn population_std(values: &[f64], mean: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

// =============================================================================
// Tests
// =============================================================================
