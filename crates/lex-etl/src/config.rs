//! Configuration types for the preprocessing pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};

/// Default token substituted for missing categorical values.
pub const DEFAULT_MISSING_TOKEN: &str = "missing";

/// Default separator between a column name and a category in generated feature names.
pub const DEFAULT_FEATURE_SEPARATOR: &str = "_";

/// How to classify a column that holds no non-missing values at all.
///
/// Such a column carries no evidence of its kind. Classifying it numeric makes
/// the transform fail with a degenerate-column error (there is no mean to
/// impute); classifying it categorical encodes it as a single constant
/// indicator for the missing token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EmptyColumnPolicy {
    /// Treat the column as numeric
    #[default]
    Numeric,
    /// Treat the column as categorical
    Categorical,
}

/// Configuration for the preprocessing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_etl::config::{EmptyColumnPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .empty_column_policy(EmptyColumnPolicy::Categorical)
///     .missing_token("NA")
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Kind assigned to columns with zero non-missing values.
    /// Default: Numeric
    pub empty_column_policy: EmptyColumnPolicy,

    /// Category substituted for missing categorical values.
    /// Default: "missing"
    pub missing_token: String,

    /// Separator placed between column name and category in indicator names.
    /// Default: "_"
    pub feature_separator: String,

    /// Whether to transform columns concurrently.
    /// Output is identical either way.
    /// Default: true
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            empty_column_policy: EmptyColumnPolicy::default(),
            missing_token: DEFAULT_MISSING_TOKEN.to_string(),
            feature_separator: DEFAULT_FEATURE_SEPARATOR.to_string(),
            parallel: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.missing_token.is_empty() {
            return Err(ConfigValidationError::EmptyValue {
                field: "missing_token".to_string(),
            });
        }

        if self.feature_separator.is_empty() {
            return Err(ConfigValidationError::EmptyValue {
                field: "feature_separator".to_string(),
            });
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': must not be empty")]
    EmptyValue { field: String },
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    empty_column_policy: Option<EmptyColumnPolicy>,
    missing_token: Option<String>,
    feature_separator: Option<String>,
    parallel: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the kind assigned to all-missing columns.
    pub fn empty_column_policy(mut self, policy: EmptyColumnPolicy) -> Self {
        self.empty_column_policy = Some(policy);
        self
    }

    /// Set the token used in place of missing categorical values.
    pub fn missing_token(mut self, token: impl Into<String>) -> Self {
        self.missing_token = Some(token.into());
        self
    }

    /// Set the separator used in generated indicator column names.
    pub fn feature_separator(mut self, separator: impl Into<String>) -> Self {
        self.feature_separator = Some(separator.into());
        self
    }

    /// Enable or disable concurrent column processing.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let config = PipelineConfig {
            empty_column_policy: self.empty_column_policy.unwrap_or_default(),
            missing_token: self
                .missing_token
                .unwrap_or_else(|| DEFAULT_MISSING_TOKEN.to_string()),
            feature_separator: self
                .feature_separator
                .unwrap_or_else(|| DEFAULT_FEATURE_SEPARATOR.to_string()),
            parallel: self.parallel.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
