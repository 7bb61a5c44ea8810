//! Integration tests for the ETL preprocessing pipeline.
//!
//! These tests verify end-to-end behavior of the pipeline using the CSV
//! fixtures under `tests/fixtures`.

use lex_etl::{
    ColumnKind, EmptyColumnPolicy, FeatureTable, FittedModel, Pipeline, PipelineConfig,
    PipelineStage, PreprocessingError, ProgressUpdate, TransformState, io,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    io::read_table(fixtures_path().join(filename)).expect("Failed to read fixture")
}

fn temp_dir(test: &str) -> PathBuf {
    std::env::temp_dir().join(format!("lex_etl_it_{}_{}", test, std::process::id()))
}

fn pipeline(parallel: bool) -> Pipeline {
    Pipeline::builder()
        .config(PipelineConfig::builder().parallel(parallel).build().unwrap())
        .build()
        .unwrap()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn snapshot(table: &FeatureTable) -> Vec<(String, Vec<u64>)> {
    table
        .column_names()
        .into_iter()
        .map(|name| {
            let bits = table
                .values(name)
                .unwrap()
                .into_iter()
                .map(f64::to_bits)
                .collect();
            (name.to_string(), bits)
        })
        .collect()
}

// ============================================================================
// Full Pipeline Tests with Employee Data
// ============================================================================

#[test]
fn test_full_pipeline_employees() {
    let df = load_csv("employees.csv");
    let result = pipeline(true).process(df).unwrap();

    assert_eq!(
        result.features.column_names(),
        vec![
            "age",
            "salary",
            "experience",
            "department_Finance",
            "department_HR",
            "department_IT",
        ]
    );
    assert_eq!(result.features.height(), 5);
    assert_eq!(result.features.null_count(), 0);

    let summary = &result.summary;
    assert_eq!(summary.rows, 5);
    assert_eq!(summary.numeric_columns, 3);
    assert_eq!(summary.categorical_columns, 1);
    assert_eq!(summary.output_columns, 6);
    assert_eq!(summary.numeric_values_imputed, 3);
    assert_eq!(summary.categorical_values_imputed, 0);
    assert!(!summary.completed_at.is_empty());
}

#[test]
fn test_missing_age_is_imputed_with_mean() {
    let result = pipeline(false).process(load_csv("employees.csv")).unwrap();

    let age = &result.model.numeric[0];
    assert_eq!(age.name, "age");
    assert_eq!(age.fill_value, 29.5);

    // The imputed row equals the column mean, so it standardizes to zero.
    let values = result.features.values("age").unwrap();
    assert!(values[2].abs() < 1e-12);
}

#[test]
fn test_department_one_hot() {
    let result = pipeline(false).process(load_csv("employees.csv")).unwrap();

    // Rows: HR, IT, HR, Finance, IT
    assert_eq!(
        result.features.values("department_HR").unwrap(),
        vec![1.0, 0.0, 1.0, 0.0, 0.0]
    );
    assert_eq!(
        result.features.values("department_IT").unwrap(),
        vec![0.0, 1.0, 0.0, 0.0, 1.0]
    );
    assert_eq!(
        result.features.values("department_Finance").unwrap(),
        vec![0.0, 0.0, 0.0, 1.0, 0.0]
    );
}

#[test]
fn test_numeric_features_are_standardized() {
    let result = pipeline(true).process(load_csv("employees.csv")).unwrap();

    for name in ["age", "salary", "experience"] {
        let (mean, std) = mean_and_std(&result.features.values(name).unwrap());
        assert!(mean.abs() < 1e-9, "{} mean was {}", name, mean);
        assert!((std - 1.0).abs() < 1e-9, "{} std was {}", name, std);
    }
}

#[test]
fn test_mixed_types_fixture() {
    let result = pipeline(true).process(load_csv("mixed.csv")).unwrap();
    let features = &result.features;

    assert_eq!(
        features.column_names(),
        vec![
            "score",
            "level",
            "grade_A",
            "grade_B",
            "grade_missing",
            "active_false",
            "active_missing",
            "active_true",
        ]
    );
    assert_eq!(result.model.kind_of("active"), Some(ColumnKind::Categorical));

    // Constant column: all zeros rather than a division by zero.
    assert_eq!(features.values("level").unwrap(), vec![0.0; 4]);
    assert_eq!(
        features.values("grade_missing").unwrap(),
        vec![0.0, 0.0, 1.0, 0.0]
    );
}

// ============================================================================
// Invariant Tests
// ============================================================================

#[test]
fn test_transform_is_deterministic() {
    let first = pipeline(true).process(load_csv("employees.csv")).unwrap();
    let second = pipeline(true).process(load_csv("employees.csv")).unwrap();
    let sequential = pipeline(false).process(load_csv("employees.csv")).unwrap();

    assert_eq!(snapshot(&first.features), snapshot(&second.features));
    assert_eq!(snapshot(&first.features), snapshot(&sequential.features));
}

#[test]
fn test_output_column_count_accounting() {
    let df = load_csv("mixed.csv");
    let result = pipeline(true).process(df).unwrap();

    let distinct: usize = result
        .model
        .categorical
        .iter()
        .map(|p| p.vocabulary.len())
        .sum();
    assert_eq!(
        result.features.width(),
        result.summary.numeric_columns + distinct
    );
}

#[test]
fn test_exactly_one_indicator_per_row_per_column() {
    let result = pipeline(true).process(load_csv("mixed.csv")).unwrap();

    for params in &result.model.categorical {
        let columns: Vec<Vec<f64>> = params
            .feature_names("_")
            .iter()
            .map(|n| result.features.values(n).unwrap())
            .collect();
        for row in 0..result.features.height() {
            let hot: f64 = columns.iter().map(|c| c[row]).sum();
            assert_eq!(hot, 1.0, "column {} row {}", params.name, row);
        }
    }
}

// ============================================================================
// Fit / Apply Tests
// ============================================================================

#[test]
fn test_apply_to_new_data() {
    let pipeline = pipeline(true);
    let model = pipeline.fit(&load_csv("employees.csv")).unwrap();

    let features = pipeline
        .apply(&model, &load_csv("employees_new.csv"))
        .unwrap();

    assert_eq!(features.column_names(), model.feature_names());
    assert_eq!(features.height(), 3);
    assert_eq!(features.null_count(), 0);

    // "Legal" and the missing department were never seen: all zeros.
    for name in ["department_Finance", "department_HR", "department_IT"] {
        let values = features.values(name).unwrap();
        assert_eq!(values[0], 0.0);
        assert_eq!(values[2], 0.0);
    }
    assert_eq!(features.values("department_IT").unwrap()[1], 1.0);

    // Missing age on new data gets the training mean.
    assert!(features.values("age").unwrap()[1].abs() < 1e-12);
}

#[test]
fn test_apply_missing_column_fails() {
    let pipeline = pipeline(false);
    let model = pipeline.fit(&load_csv("employees.csv")).unwrap();

    let df = load_csv("employees.csv").drop("salary").unwrap();
    let err = pipeline.apply(&model, &df).unwrap_err();
    assert!(matches!(err, PreprocessingError::ColumnNotFound(ref c) if c == "salary"));
}

#[test]
fn test_saved_model_reproduces_output() {
    let dir = temp_dir("model");
    let model_path = dir.join("model.json");

    let pipeline = pipeline(true);
    let result = pipeline.process(load_csv("employees.csv")).unwrap();
    result.model.save(&model_path).unwrap();

    let loaded = FittedModel::load(&model_path).unwrap();
    assert_eq!(loaded, result.model);

    let reapplied = pipeline.apply(&loaded, &load_csv("employees.csv")).unwrap();
    assert_eq!(snapshot(&reapplied), snapshot(&result.features));

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Degenerate Input Tests
// ============================================================================

#[test]
fn test_all_missing_column_fails_by_default() {
    let err = pipeline(true)
        .process(load_csv("all_missing.csv"))
        .unwrap_err();
    assert_eq!(err.error_code(), "DEGENERATE_COLUMN");
    assert!(err.to_string().contains("bonus"));
}

#[test]
fn test_all_missing_column_as_categorical() {
    let config = PipelineConfig::builder()
        .empty_column_policy(EmptyColumnPolicy::Categorical)
        .build()
        .unwrap();
    let result = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process(load_csv("all_missing.csv"))
        .unwrap();

    assert_eq!(
        result.features.column_names(),
        vec!["id", "bonus_missing", "team_blue", "team_red"]
    );
    assert_eq!(result.features.values("bonus_missing").unwrap(), vec![1.0; 3]);
}

#[test]
fn test_numeric_only_table_has_no_indicators() {
    let df = df!["a" => [1.0, 2.0, 3.0], "b" => [10i64, 20, 30]].unwrap();
    let result = pipeline(true).process(df).unwrap();

    assert_eq!(result.features.column_names(), vec!["a", "b"]);
    assert_eq!(result.summary.categorical_columns, 0);
}

// ============================================================================
// Progress Tests
// ============================================================================

#[test]
fn test_progress_updates_cover_every_column() {
    let updates: Arc<Mutex<Vec<ProgressUpdate>>> = Arc::new(Mutex::new(Vec::new()));
    let updates_clone = updates.clone();

    Pipeline::builder()
        .on_progress(move |update| updates_clone.lock().unwrap().push(update))
        .build()
        .unwrap()
        .process(load_csv("employees.csv"))
        .unwrap();

    let updates = updates.lock().unwrap();
    let fitted: Vec<_> = updates
        .iter()
        .filter(|u| u.stage == PipelineStage::Fitting)
        .filter_map(|u| u.column.as_deref())
        .collect();
    assert_eq!(fitted.len(), 4);

    let encoded: Vec<_> = updates
        .iter()
        .filter(|u| u.stage == PipelineStage::CategoricalTransform)
        .filter_map(|u| u.column.as_deref())
        .collect();
    assert_eq!(encoded, vec!["department"]);

    let last = updates.last().unwrap();
    assert_eq!(last.state, TransformState::Transformed);
    assert!(updates.iter().all(|u| (0.0..=1.0).contains(&u.progress)));
}

// ============================================================================
// Extract / Load Tests
// ============================================================================

#[test]
fn test_extract_transform_load() {
    let dir = temp_dir("etl");
    let output = dir.join("output").join("processed_data.csv");

    let result = pipeline(true).process(load_csv("employees.csv")).unwrap();
    let expected = result.features.column_names().join(",");
    let mut frame = result.features.into_frame().unwrap();
    io::write_table(&mut frame, &output).unwrap();

    let written = io::read_table(&output).unwrap();
    assert_eq!(written.shape(), (5, 6));
    let names: Vec<&str> = written
        .get_column_names()
        .into_iter()
        .map(|n| n.as_str())
        .collect();
    assert_eq!(names.join(","), expected);
    for column in written.get_columns() {
        assert_eq!(column.dtype(), &DataType::Float64);
        assert_eq!(column.null_count(), 0);
    }

    std::fs::remove_dir_all(&dir).ok();
}
