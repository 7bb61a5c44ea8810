//! Extraction and load of tables on disk.
//!
//! Readers are chosen by file extension. Everything here is a thin wrapper
//! over the polars readers and writers; the engine itself never touches disk.

use crate::error::{PreprocessingError, Result, ResultExt};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Read a table from `path`, choosing the reader from the file extension.
///
/// `.csv` files must have a header row; column types are inferred from the
/// whole file. `.parquet` files are read as-is.
///
/// # Errors
///
/// Returns [`PreprocessingError::UnsupportedInput`] for any other extension.
pub fn read_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    info!("Extracting data from {}", path.display());

    let df = match extension.as_deref() {
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .context(format!("Reading CSV {}", path.display()))?,
        Some("parquet") => {
            let file = File::open(path)?;
            ParquetReader::new(file)
                .finish()
                .context(format!("Reading Parquet {}", path.display()))?
        }
        _ => {
            return Err(PreprocessingError::UnsupportedInput(
                path.display().to_string(),
            ));
        }
    };

    info!(
        "Extracted {} rows x {} columns",
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Write `df` as CSV with a header row, creating parent directories.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)
        .context(format!("Writing CSV {}", path.display()))?;

    info!("Loaded {} rows into {}", df.height(), path.display());
    Ok(())
}

/// Small employee dataset with a few missing values in every column kind.
pub fn sample_dataset() -> Result<DataFrame> {
    let df = df![
        "age" => [Some(25.0), Some(30.0), None, Some(35.0), Some(28.0)],
        "salary" => [Some(50000.0), Some(60000.0), Some(55000.0), None, Some(52000.0)],
        "department" => ["HR", "IT", "HR", "Finance", "IT"],
        "experience" => [Some(2.0), Some(5.0), Some(3.0), Some(7.0), None],
    ]?;
    Ok(df)
}
