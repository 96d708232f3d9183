//! Row pruning by null count. Each table is pruned on its own.

use crate::error::Result;
use polars::prelude::*;

/// Number of null cells in every row.
pub fn row_null_counts(frame: &DataFrame) -> Vec<u32> {
    let mut counts = vec![0u32; frame.height()];
    for column in frame.get_columns() {
        if column.null_count() == 0 {
            continue;
        }
        let nulls = column.as_materialized_series().is_null();
        for (count, is_null) in counts.iter_mut().zip(&nulls) {
            if is_null.unwrap_or(false) {
                *count += 1;
            }
        }
    }
    counts
}

/// Keeps the rows with at most `max_nulls` null cells.
pub fn prune_rows(frame: &DataFrame, max_nulls: u32) -> Result<DataFrame> {
    let mask: BooleanChunked = row_null_counts(frame)
        .into_iter()
        .map(|count| count <= max_nulls)
        .collect();
    let pruned = frame.filter(&mask)?;

    tracing::info!(
        "Row pruning at {max_nulls} nulls: kept {} of {} rows",
        pruned.height(),
        frame.height()
    );
    Ok(pruned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide_frame(nulls_per_row: &[usize], width: usize) -> Result<DataFrame> {
        let columns = (0..width)
            .map(|c| {
                let cells: Vec<Option<f64>> = nulls_per_row
                    .iter()
                    .map(|&nulls| (c >= nulls).then_some(1.0))
                    .collect();
                Column::new(format!("COL_{c}").into(), cells)
            })
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    #[test]
    fn test_row_null_counts() -> Result<()> {
        let frame = df!(
            "A" => &[None, Some(1i64), None],
            "B" => &[None, Some(1i64), Some(2)]
        )?;
        assert_eq!(row_null_counts(&frame), vec![2, 0, 1]);
        Ok(())
    }

    #[test]
    fn test_threshold_is_inclusive() -> Result<()> {
        let frame = wide_frame(&[51, 50, 0], 60)?;
        let pruned = prune_rows(&frame, 50)?;
        assert_eq!(pruned.height(), 2);
        assert_eq!(row_null_counts(&pruned), vec![50, 0]);
        assert_eq!(frame.height(), 3, "input must be untouched");
        Ok(())
    }

    #[test]
    fn test_empty_frame() -> Result<()> {
        let frame = wide_frame(&[], 3)?;
        let pruned = prune_rows(&frame, 0)?;
        assert_eq!(pruned.height(), 0);
        assert_eq!(pruned.width(), 3);
        Ok(())
    }
}
