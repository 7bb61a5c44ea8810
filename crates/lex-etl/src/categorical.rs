//! Categorical stage: sentinel imputation followed by one-hot encoding.
//!
//! Missing values become the configured missing token, which is then an
//! ordinary category. The vocabulary is the sorted set of distinct textual
//! values seen at fit time; each entry becomes one `0.0`/`1.0` indicator column
//! named `<column><separator><entry>`. A value that is not in the vocabulary
//! encodes as all zeros for that column.

use crate::error::{PreprocessingError, Result, ResultExt};
use crate::types::{FeatureTable, StageOutput};
use crate::utils::{string_values, try_map_ordered};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Learned parameters for one categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalParams {
    /// Source column name.
    pub name: String,
    /// Distinct imputed values, sorted lexicographically by their text.
    pub vocabulary: Vec<String>,
}

impl CategoricalParams {
    /// Output feature names, in vocabulary order.
    pub fn feature_names(&self, separator: &str) -> Vec<String> {
        self.vocabulary
            .iter()
            .map(|entry| format!("{}{}{}", self.name, separator, entry))
            .collect()
    }

    /// Position of a value in the vocabulary, `None` for an unknown category.
    #[inline]
    pub fn index_of(&self, value: &str) -> Option<usize> {
        self.vocabulary
            .binary_search_by(|entry| entry.as_str().cmp(value))
            .ok()
    }
}

/// Imputes and one-hot encodes categorical columns.
pub struct CategoricalStage;

impl CategoricalStage {
    /// Build the vocabulary of one column.
    pub fn fit_column(series: &Series, missing_token: &str) -> Result<CategoricalParams> {
        let name = series.name().to_string();
        let (values, _) = string_values(series, missing_token)?;

        let vocabulary: Vec<String> = values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        debug!(
            "Fitted categorical '{}': {} categories",
            name,
            vocabulary.len()
        );

        Ok(CategoricalParams { name, vocabulary })
    }

    /// Encode one column with a fitted vocabulary.
    ///
    /// Returns the indicator columns, the number of imputed values and the
    /// number of values that were not in the vocabulary.
    pub fn transform_column(
        params: &CategoricalParams,
        series: &Series,
        missing_token: &str,
        separator: &str,
    ) -> Result<(Vec<Column>, usize, usize)> {
        let (values, imputed) = string_values(series, missing_token)?;
        let height = values.len();

        let mut indicators = vec![vec![0.0f64; height]; params.vocabulary.len()];
        let mut unknown = 0;

        for (row, value) in values.iter().enumerate() {
            match params.index_of(value) {
                Some(idx) => indicators[idx][row] = 1.0,
                None => unknown += 1,
            }
        }

        if unknown > 0 {
            debug!(
                "Column '{}': {} value(s) outside the fitted vocabulary encoded as all zeros",
                params.name, unknown
            );
        }

        let columns = params
            .feature_names(separator)
            .into_iter()
            .zip(indicators)
            .map(|(name, values)| Series::new(name.into(), values).into_column())
            .collect();

        Ok((columns, imputed, unknown))
    }

    /// Fit every listed column of `df`.
    pub fn fit(
        df: &DataFrame,
        columns: &[String],
        missing_token: &str,
        parallel: bool,
        on_column: &(dyn Fn(&str) + Sync),
    ) -> Result<Vec<CategoricalParams>> {
        try_map_ordered(columns, parallel, |name| {
            let column = df
                .column(name)
                .map_err(|_| PreprocessingError::ColumnNotFound(name.clone()))?;
            let params = Self::fit_column(column.as_materialized_series(), missing_token)
                .context(format!("Fitting categorical column '{}'", name))?;
            on_column(name);
            Ok(params)
        })
    }

    /// Encode every fitted column of `df` into a feature table.
    ///
    /// Columns are emitted in fitted column order, then vocabulary order.
    pub fn transform(
        df: &DataFrame,
        params: &[CategoricalParams],
        missing_token: &str,
        separator: &str,
        parallel: bool,
        on_column: &(dyn Fn(&str) + Sync),
    ) -> Result<StageOutput> {
        let results = try_map_ordered(params, parallel, |p| {
            let column = df
                .column(&p.name)
                .map_err(|_| PreprocessingError::ColumnNotFound(p.name.clone()))?;
            let result = Self::transform_column(
                p,
                column.as_materialized_series(),
                missing_token,
                separator,
            )
            .context(format!("Encoding categorical column '{}'", p.name))?;
            on_column(&p.name);
            Ok(result)
        })?;

        let mut imputed = 0;
        let mut unknown = 0;
        let mut columns = Vec::new();
        for (encoded, filled, unseen) in results {
            columns.extend(encoded);
            imputed += filled;
            unknown += unseen;
        }

        Ok(StageOutput {
            table: FeatureTable::new(df.height(), columns),
            imputed,
            unknown,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn no_op(_: &str) {}

    fn department() -> Series {
        Series::new("department".into(), &["HR", "IT", "HR", "Finance", "IT"])
    }

    #[test]
    fn test_vocabulary_is_sorted_and_distinct() {
        let params = CategoricalStage::fit_column(&department(), "missing").unwrap();
        assert_eq!(params.vocabulary, vec!["Finance", "HR", "IT"]);
    }

    #[test]
    fn test_one_hot_encoding_of_department() {
        let series = department();
        let params = CategoricalStage::fit_column(&series, "missing").unwrap();
        let (columns, imputed, unknown) =
            CategoricalStage::transform_column(&params, &series, "missing", "_").unwrap();

        let table = FeatureTable::new(5, columns);
        assert_eq!(
            table.column_names(),
            vec!["department_Finance", "department_HR", "department_IT"]
        );
        // Row 0 is HR.
        assert_eq!(table.values("department_Finance").unwrap()[0], 0.0);
        assert_eq!(table.values("department_HR").unwrap()[0], 1.0);
        assert_eq!(table.values("department_IT").unwrap()[0], 0.0);
        assert_eq!(imputed, 0);
        assert_eq!(unknown, 0);
    }

    #[test]
    fn test_missing_values_become_missing_category() {
        let series = Series::new("city".into(), &[Some("Oslo"), None, Some("Bergen")]);
        let params = CategoricalStage::fit_column(&series, "missing").unwrap();
        assert_eq!(params.vocabulary, vec!["Bergen", "Oslo", "missing"]);

        let (columns, imputed, _) =
            CategoricalStage::transform_column(&params, &series, "missing", "_").unwrap();
        let table = FeatureTable::new(3, columns);
        assert_eq!(imputed, 1);
        assert_eq!(table.values("city_missing").unwrap(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_single_value_column_yields_one_constant_indicator() {
        let series = Series::new("country".into(), &["NO", "NO", "NO"]);
        let params = CategoricalStage::fit_column(&series, "missing").unwrap();
        let (columns, _, _) =
            CategoricalStage::transform_column(&params, &series, "missing", "_").unwrap();

        let table = FeatureTable::new(3, columns);
        assert_eq!(table.width(), 1);
        assert_eq!(table.values("country_NO").unwrap(), vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_encodes_as_all_zeros() {
        let params = CategoricalStage::fit_column(&department(), "missing").unwrap();
        let new = Series::new("department".into(), &["Legal", "IT"]);

        let (columns, _, unknown) =
            CategoricalStage::transform_column(&params, &new, "missing", "_").unwrap();
        let table = FeatureTable::new(2, columns);

        assert_eq!(unknown, 1);
        for name in table.column_names() {
            assert_eq!(table.values(name).unwrap()[0], 0.0);
        }
        assert_eq!(table.values("department_IT").unwrap()[1], 1.0);
    }

    #[test]
    fn test_missing_on_new_data_without_missing_category_is_unknown() {
        let params = CategoricalStage::fit_column(&department(), "missing").unwrap();
        let new = Series::new("department".into(), &[Option::<&str>::None]);

        let (_, imputed, unknown) =
            CategoricalStage::transform_column(&params, &new, "missing", "_").unwrap();
        assert_eq!(imputed, 1);
        assert_eq!(unknown, 1);
    }

    #[test]
    fn test_exactly_one_indicator_per_row() {
        let series = Series::new(
            "size".into(),
            &[Some("S"), Some("M"), None, Some("L"), Some("M")],
        );
        let params = CategoricalStage::fit_column(&series, "missing").unwrap();
        let (columns, _, _) =
            CategoricalStage::transform_column(&params, &series, "missing", "_").unwrap();
        let table = FeatureTable::new(5, columns);

        for row in 0..5 {
            let hot: f64 = table
                .column_names()
                .iter()
                .map(|name| table.values(name).unwrap()[row])
                .sum();
            assert_eq!(hot, 1.0);
        }
    }

    #[test]
    fn test_custom_separator() {
        let params = CategoricalParams {
            name: "color".to_string(),
            vocabulary: vec!["blue".to_string(), "red".to_string()],
        };
        assert_eq!(params.feature_names("="), vec!["color=blue", "color=red"]);
    }

    #[test]
    fn test_group_transform_orders_by_column_then_vocabulary() {
        let df = df![
            "size" => ["M", "S"],
            "color" => ["red", "blue"],
        ]
        .unwrap();
        let columns = vec!["size".to_string(), "color".to_string()];

        let params = CategoricalStage::fit(&df, &columns, "missing", true, &no_op).unwrap();
        let output =
            CategoricalStage::transform(&df, &params, "missing", "_", true, &no_op).unwrap();

        assert_eq!(
            output.table.column_names(),
            vec!["size_M", "size_S", "color_blue", "color_red"]
        );
        assert_eq!(output.table.height(), 2);
    }
}
