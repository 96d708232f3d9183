//! Mean imputation of the nulls left after pruning.

use crate::error::{CleanError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What to do with a numeric column that has no values at all, where a mean
/// does not exist.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum EmptyColumnPolicy {
    /// Stop with `ImputationUndefined`
    #[default]
    Fail,
    /// Leave the nulls in place
    Keep,
    /// Remove the column (from both tables when run through the pipeline)
    Drop,
}

fn is_numeric_like(dtype: &DataType) -> bool {
    dtype.is_primitive_numeric() || matches!(dtype, DataType::Null)
}

/// Numeric columns in which every cell is null.
pub fn empty_numeric_columns(frame: &DataFrame) -> BTreeSet<String> {
    if frame.height() == 0 {
        return BTreeSet::new();
    }
    frame
        .get_columns()
        .iter()
        .filter(|column| is_numeric_like(column.dtype()) && column.null_count() == column.len())
        .map(|column| column.name().to_string())
        .collect()
}

/// Fills nulls in numeric columns with the column mean. Columns that have no
/// nulls, and non-numeric columns, are returned as they are.
///
/// # Errors
///
/// `ImputationUndefined` for an all-null numeric column under
/// [`EmptyColumnPolicy::Fail`].
pub fn impute_means(frame: &DataFrame, policy: EmptyColumnPolicy) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(frame.width());
    let mut filled = 0usize;

    for column in frame.get_columns() {
        if !is_numeric_like(column.dtype()) || column.null_count() == 0 {
            columns.push(column.clone());
            continue;
        }

        let casted = column.as_materialized_series().cast(&DataType::Float64)?;
        let Some(mean) = casted.mean() else {
            match policy {
                EmptyColumnPolicy::Fail => {
                    return Err(CleanError::ImputationUndefined {
                        column: column.name().to_string(),
                    });
                }
                EmptyColumnPolicy::Keep => {
                    tracing::warn!("Column {} has no values, nulls kept", column.name());
                    columns.push(column.clone());
                }
                EmptyColumnPolicy::Drop => {
                    tracing::warn!("Column {} has no values, dropped", column.name());
                }
            }
            continue;
        };

        let values: Vec<f64> = casted
            .f64()?
            .into_iter()
            .map(|cell| cell.unwrap_or(mean))
            .collect();
        columns.push(Column::new(column.name().clone(), values));
        filled += 1;
    }

    tracing::debug!("Mean-imputed {filled} columns");
    Ok(DataFrame::new(columns)?)
}
