//! Numeric stage: mean imputation followed by standardization.
//!
//! Each column is handled independently. Fitting learns the imputation mean
//! and the center/scale of the imputed column; transforming replaces missing
//! values with the learned mean and rescales to zero mean and unit variance.

use crate::error::{PreprocessingError, Result, ResultExt};
use crate::types::{FeatureTable, StageOutput};
use crate::utils::{mean, numeric_values, population_std, try_map_ordered};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Learned parameters for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericParams {
    /// Column name, reused unchanged as the output feature name.
    pub name: String,
    /// Mean of the non-missing values, substituted for missing ones.
    pub fill_value: f64,
    /// Mean of the imputed column.
    pub center: f64,
    /// Population standard deviation of the imputed column; 0 for a constant column.
    pub scale: f64,
}

impl NumericParams {
    /// Whether the column was constant at fit time (standardizes to all zeros).
    pub fn is_constant(&self) -> bool {
        self.scale == 0.0
    }

    /// Standardize a single (already imputed) value.
    #[inline]
    pub fn standardize(&self, value: f64) -> f64 {
        if self.is_constant() {
            0.0
        } else {
            (value - self.center) / self.scale
        }
    }
}

/// Collapse a standard deviation that is only rounding noise to exactly zero.
///
/// A constant column such as `[0.1, 0.1, 0.1]` can produce a mean that is off by
/// one ulp, which leaves a tiny non-zero deviation; dividing by it would blow
/// rounding error up to order one. The variance is treated as zero when it is
/// within the accumulated error of summing `n` values around `center`, a bound
/// that scales with the data rather than with an absolute floor.
fn effective_scale(std: f64, center: f64, n: usize) -> f64 {
    if !std.is_finite() {
        return 0.0;
    }
    let n = n as f64;
    let variance = std * std;
    let bound = n * f64::EPSILON * variance + (n * center * f64::EPSILON).powi(2);
    if variance <= bound { 0.0 } else { std }
}

/// Imputes and standardizes numeric columns.
pub struct NumericStage;

impl NumericStage {
    /// Learn the parameters of one column.
    ///
    /// Fails with [`PreprocessingError::DegenerateColumn`] when the column has no
    /// non-missing values, since there is no mean to impute with.
    pub fn fit_column(series: &Series) -> Result<NumericParams> {
        let name = series.name().to_string();
        let values = numeric_values(series)?;

        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let fill_value =
            mean(&present).ok_or_else(|| PreprocessingError::DegenerateColumn(name.clone()))?;

        let imputed: Vec<f64> = values.iter().map(|v| v.unwrap_or(fill_value)).collect();
        // Non-empty: `present` was non-empty and is a subset of `imputed`.
        let center = mean(&imputed).unwrap_or(fill_value);
        let std = population_std(&imputed, center).unwrap_or(0.0);
        let scale = effective_scale(std, center, imputed.len());

        debug!(
            "Fitted numeric '{}': fill={:.4}, center={:.4}, scale={:.4}",
            name, fill_value, center, scale
        );

        Ok(NumericParams {
            name,
            fill_value,
            center,
            scale,
        })
    }

    /// Impute and standardize one column with previously fitted parameters.
    ///
    /// Returns the output column and the number of values that were imputed.
    pub fn transform_column(params: &NumericParams, series: &Series) -> Result<(Column, usize)> {
        let values = numeric_values(series)?;

        let mut imputed = 0;
        let output: Vec<f64> = values
            .into_iter()
            .map(|v| {
                let value = v.unwrap_or_else(|| {
                    imputed += 1;
                    params.fill_value
                });
                params.standardize(value)
            })
            .collect();

        let column = Series::new(params.name.as_str().into(), output).into_column();
        Ok((column, imputed))
    }

    /// Fit every listed column of `df`.
    pub fn fit(
        df: &DataFrame,
        columns: &[String],
        parallel: bool,
        on_column: &(dyn Fn(&str) + Sync),
    ) -> Result<Vec<NumericParams>> {
        try_map_ordered(columns, parallel, |name| {
            let column = df
                .column(name)
                .map_err(|_| PreprocessingError::ColumnNotFound(name.clone()))?;
            let params = Self::fit_column(column.as_materialized_series())
                .context(format!("Fitting numeric column '{}'", name))?;
            on_column(name);
            Ok(params)
        })
    }

    /// Transform every fitted column of `df` into a feature table.
    pub fn transform(
        df: &DataFrame,
        params: &[NumericParams],
        parallel: bool,
        on_column: &(dyn Fn(&str) + Sync),
    ) -> Result<StageOutput> {
        let results = try_map_ordered(params, parallel, |p| {
            let column = df
                .column(&p.name)
                .map_err(|_| PreprocessingError::ColumnNotFound(p.name.clone()))?;
            let result = Self::transform_column(p, column.as_materialized_series())
                .context(format!("Transforming numeric column '{}'", p.name))?;
            on_column(&p.name);
            Ok(result)
        })?;

        let mut imputed = 0;
        let columns = results
            .into_iter()
            .map(|(column, count)| {
                imputed += count;
                column
            })
            .collect();

        Ok(StageOutput {
            table: FeatureTable::new(df.height(), columns),
            imputed,
            unknown: 0,
        })
    }
}
