//! Fitted preprocessing parameters.
//!
//! A [`FittedModel`] is produced once by `Pipeline::fit` and never mutated.
//! Passing it to `Pipeline::apply` transforms any table with the same columns
//! exactly the way the training table was transformed. It can be written to
//! and read from JSON so a model fitted in one run can be applied in another.

use crate::categorical::CategoricalParams;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::numeric::NumericParams;
use crate::types::ColumnKind;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Immutable per-column parameters learned from a training table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    /// Numeric columns in original column order.
    pub numeric: Vec<NumericParams>,
    /// Categorical columns in original column order.
    pub categorical: Vec<CategoricalParams>,
    /// Token that replaced missing categorical values at fit time.
    pub missing_token: String,
    /// Separator used in generated indicator names.
    pub feature_separator: String,
    /// Row count of the table the model was fitted on.
    pub fitted_rows: usize,
}

impl FittedModel {
    /// Names of the columns `apply` produces, in output order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|p| p.name.clone()).collect();
        for params in &self.categorical {
            names.extend(params.feature_names(&self.feature_separator));
        }
        names
    }

    /// Number of columns `apply` produces.
    pub fn n_features_out(&self) -> usize {
        self.numeric.len()
            + self
                .categorical
                .iter()
                .map(|p| p.vocabulary.len())
                .sum::<usize>()
    }

    /// Names of the input columns the model expects.
    pub fn input_columns(&self) -> Vec<&str> {
        self.numeric
            .iter()
            .map(|p| p.name.as_str())
            .chain(self.categorical.iter().map(|p| p.name.as_str()))
            .collect()
    }

    /// Kind the model assigned to an input column.
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        if self.numeric.iter().any(|p| p.name == column) {
            Some(ColumnKind::Numeric)
        } else if self.categorical.iter().any(|p| p.name == column) {
            Some(ColumnKind::Categorical)
        } else {
            None
        }
    }

    /// Check that the model can be applied as-is.
    ///
    /// The missing token and separator must be non-empty and every vocabulary
    /// strictly increasing, since lookups binary-search it. A hand-edited or
    /// foreign model file can break either.
    pub fn validate(&self) -> Result<()> {
        if self.missing_token.is_empty() || self.feature_separator.is_empty() {
            return Err(PreprocessingError::InvalidConfig(
                "model has an empty missing token or feature separator".to_string(),
            ));
        }

        for params in &self.categorical {
            if let Some(pair) = params.vocabulary.windows(2).find(|w| w[0] >= w[1]) {
                return Err(PreprocessingError::InvalidConfig(format!(
                    "vocabulary of '{}' is not sorted and distinct at '{}', '{}'",
                    params.name, pair[0], pair[1]
                )));
            }
        }

        Ok(())
    }

    /// Write the model as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(PreprocessingError::from)
            .context(format!("Writing model to {}", path.display()))?;
        writer.flush()?;

        info!("Model saved: {}", path.display());
        Ok(())
    }

    /// Read a model previously written with [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let model: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(PreprocessingError::from)
            .context(format!("Reading model from {}", path.display()))?;
        model
            .validate()
            .context(format!("Validating model from {}", path.display()))?;
        Ok(model)
    }
}
