//! Reading and writing tables by file extension.

use crate::error::{CleanError, Result, ResultExt as _};
use polars::prelude::*;
use std::path::Path;

/// Rows read before the CSV schema is fixed. Sparse survey columns need a
/// long look before their first non-null cell shows up.
const INFER_SCHEMA_ROWS: usize = 10_000;

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Loads a CSV, Parquet or JSON table. CSV files are read comma-separated;
/// use [`load_df_with_separator`] for other separators.
pub fn load_df(path: &Path) -> Result<DataFrame> {
    load_df_with_separator(path, b',')
}

/// Like [`load_df`], with `separator` used for CSV files.
pub fn load_df_with_separator(path: &Path, separator: u8) -> Result<DataFrame> {
    let ext = extension(path);
    let df = match ext.as_str() {
        "csv" => load_csv(path, separator)?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?)
            .finish()
            .with_context(|| format!("Failed to read Parquet {}", path.display()))?,
        "json" => JsonReader::new(std::fs::File::open(path)?)
            .finish()
            .with_context(|| format!("Failed to read JSON {}", path.display()))?,
        _ => {
            return Err(CleanError::Other(format!(
                "Unsupported file extension '{ext}' for {}",
                path.display()
            )));
        }
    };

    tracing::debug!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

pub fn load_csv(path: &Path, separator: u8) -> Result<DataFrame> {
    LazyCsvReader::new(path)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .with_separator(separator)
        .finish()?
        .collect()
        .with_context(|| format!("Failed to read CSV {}", path.display()))
}

/// Writes Parquet for a `.parquet` path and CSV for anything else.
pub fn save_df(df: &mut DataFrame, path: &Path) -> Result<()> {
    if extension(path) == "parquet" {
        let file = std::fs::File::create(path).context("Failed to create Parquet file")?;
        ParquetWriter::new(file)
            .finish(df)
            .context("Failed to write Parquet file")?;
    } else {
        let file = std::fs::File::create(path).context("Failed to create CSV file")?;
        CsvWriter::new(file)
            .include_header(true)
            .finish(df)
            .context("Failed to write CSV file")?;
    }

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}
