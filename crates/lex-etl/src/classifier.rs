//! Column classification.
//!
//! Splits a table's columns into a numeric and a categorical group. A column is
//! numeric when every non-missing value is a real number, categorical otherwise.

use crate::config::EmptyColumnPolicy;
use crate::error::Result;
use crate::types::{ClassifiedColumns, ColumnKind};
use crate::utils::{DtypeCategory, get_dtype_category, parse_numeric_value, present_count};
use polars::prelude::*;
use tracing::debug;

/// Assigns a [`ColumnKind`] to every column of a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnClassifier {
    empty_column_policy: EmptyColumnPolicy,
}

impl ColumnClassifier {
    pub fn new(empty_column_policy: EmptyColumnPolicy) -> Self {
        Self {
            empty_column_policy,
        }
    }

    /// Classify every column of `df`, preserving column order within each group.
    pub fn classify(&self, df: &DataFrame) -> Result<ClassifiedColumns> {
        let mut classified = ClassifiedColumns::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            let kind = self.classify_series(series)?;
            debug!("  {}: {} -> {}", series.name(), series.dtype(), kind);
            classified.push(series.name().as_str(), kind);
        }

        Ok(classified)
    }

    /// Classify a single series.
    pub fn classify_series(&self, series: &Series) -> Result<ColumnKind> {
        if present_count(series) == 0 {
            return Ok(match self.empty_column_policy {
                EmptyColumnPolicy::Numeric => ColumnKind::Numeric,
                EmptyColumnPolicy::Categorical => ColumnKind::Categorical,
            });
        }

        let kind = match get_dtype_category(series.dtype()) {
            DtypeCategory::Numeric => ColumnKind::Numeric,
            DtypeCategory::String => {
                if Self::all_numeric_strings(series)? {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Categorical
                }
            }
            // A null-dtype column always has zero present values and was handled above.
            DtypeCategory::Null | DtypeCategory::Other => ColumnKind::Categorical,
        };

        Ok(kind)
    }

    fn all_numeric_strings(series: &Series) -> Result<bool> {
        Ok(series
            .str()?
            .into_iter()
            .flatten()
            .all(|v| parse_numeric_value(v).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_mixed_table() {
        let df = df![
            "age" => [Some(25.0), Some(30.0), None],
            "department" => ["HR", "IT", "HR"],
            "experience" => [2i64, 5, 3],
        ]
        .unwrap();

        let classified = ColumnClassifier::default().classify(&df).unwrap();

        assert_eq!(classified.numeric.columns, vec!["age", "experience"]);
        assert_eq!(classified.categorical.columns, vec!["department"]);
        assert_eq!(classified.total(), 3);
    }

    #[test]
    fn test_numeric_strings_are_numeric() {
        let series = Series::new("amount".into(), &[Some("1.5"), None, Some("42")]);
        let kind = ColumnClassifier::default().classify_series(&series).unwrap();
        assert_eq!(kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_one_non_numeric_string_makes_column_categorical() {
        let series = Series::new("code".into(), &["1", "2", "x3"]);
        let kind = ColumnClassifier::default().classify_series(&series).unwrap();
        assert_eq!(kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_decimal_and_wide_integers_are_numeric() {
        let classifier = ColumnClassifier::default();

        let decimals = Series::new("price".into(), &[1.5, 2.25, 3.0])
            .cast(&DataType::Decimal(Some(10), Some(2)))
            .unwrap();
        assert_eq!(
            classifier.classify_series(&decimals).unwrap(),
            ColumnKind::Numeric
        );

        let wide = Series::new("id".into(), &[1i64, 2, 3])
            .cast(&DataType::Int128)
            .unwrap();
        assert_eq!(
            classifier.classify_series(&wide).unwrap(),
            ColumnKind::Numeric
        );
    }

    #[test]
    fn test_boolean_is_categorical() {
        let series = Series::new("active".into(), &[true, false, true]);
        let kind = ColumnClassifier::default().classify_series(&series).unwrap();
        assert_eq!(kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_all_missing_defaults_to_numeric() {
        let series = Series::new("empty".into(), &[Option::<f64>::None, None]);
        let kind = ColumnClassifier::default().classify_series(&series).unwrap();
        assert_eq!(kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_all_missing_string_column_follows_policy() {
        let series = Series::new("empty".into(), &[Option::<&str>::None, None]);

        let numeric = ColumnClassifier::new(EmptyColumnPolicy::Numeric)
            .classify_series(&series)
            .unwrap();
        let categorical = ColumnClassifier::new(EmptyColumnPolicy::Categorical)
            .classify_series(&series)
            .unwrap();

        assert_eq!(numeric, ColumnKind::Numeric);
        assert_eq!(categorical, ColumnKind::Categorical);
    }

    #[test]
    fn test_all_nan_float_column_counts_as_empty() {
        let series = Series::new("nan".into(), &[f64::NAN, f64::NAN]);
        let kind = ColumnClassifier::new(EmptyColumnPolicy::Categorical)
            .classify_series(&series)
            .unwrap();
        assert_eq!(kind, ColumnKind::Categorical);
    }
}
