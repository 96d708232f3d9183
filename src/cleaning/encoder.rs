//! One-hot expansion of text columns.
//!
//! The encoding is fitted on the reference table and then applied to both
//! tables, so the customer table is always encoded with the reference
//! table's categories. A customer value the reference never had gets no
//! indicator column; its rows are all zero across that column's indicators.

use super::normalizer::is_textual;
use crate::error::{CleanError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;

/// A text column and the categories it expands into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedColumn {
    pub source: String,
    pub categories: Vec<String>,
}

impl EncodedColumn {
    pub fn indicator_name(&self, category: &str) -> String {
        format!("{}_{category}", self.source)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoricalEncoding {
    columns: Vec<EncodedColumn>,
}

impl CategoricalEncoding {
    /// Collects the text columns of `reference` and their distinct values,
    /// sorted, nulls excluded.
    pub fn fit(reference: &DataFrame) -> Result<Self> {
        let mut columns = Vec::new();
        for column in reference.get_columns() {
            if !is_textual(column.dtype()) {
                continue;
            }
            let casted = column.as_materialized_series().cast(&DataType::String)?;
            let categories: BTreeSet<String> = casted
                .str()?
                .into_iter()
                .flatten()
                .map(str::to_owned)
                .collect();
            columns.push(EncodedColumn {
                source: column.name().to_string(),
                categories: categories.into_iter().collect(),
            });
        }

        tracing::info!(
            "Fitted categorical encoding: {} text columns, {} indicator columns",
            columns.len(),
            columns.iter().map(|c| c.categories.len()).sum::<usize>()
        );
        Ok(Self { columns })
    }

    /// Replaces every fitted source column with `Int32` indicator columns
    /// appended after the remaining columns.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if an indicator name is already taken by another
    /// column, e.g. `TYPE_A` next to a `TYPE` column with category `A`.
    pub fn transform(&self, frame: &DataFrame) -> Result<DataFrame> {
        let sources: BTreeSet<&str> = self.source_columns().collect();
        let mut columns: Vec<Column> = frame
            .get_columns()
            .iter()
            .filter(|column| !sources.contains(column.name().as_str()))
            .cloned()
            .collect();

        let mut taken: BTreeSet<String> = columns.iter().map(|c| c.name().to_string()).collect();
        for name in self.indicator_columns() {
            if !taken.insert(name.clone()) {
                return Err(CleanError::SchemaMismatch(format!(
                    "indicator column '{name}' collides with an existing column"
                )));
            }
        }

        for encoded in &self.columns {
            let Ok(column) = frame.column(&encoded.source) else {
                tracing::warn!(
                    "Column {} missing from table, its indicators are all zero",
                    encoded.source
                );
                for category in &encoded.categories {
                    let zeros = vec![0i32; frame.height()];
                    columns.push(Column::new(encoded.indicator_name(category).into(), zeros));
                }
                continue;
            };

            let casted = column.as_materialized_series().cast(&DataType::String)?;
            let cells = casted.str()?;

            let known: BTreeSet<&str> = encoded.categories.iter().map(String::as_str).collect();
            let unseen = cells
                .into_iter()
                .flatten()
                .filter(|cell| !known.contains(cell))
                .count();
            if unseen > 0 {
                tracing::warn!(
                    "Column {}: {unseen} values have no category in the reference table",
                    encoded.source
                );
            }

            for category in &encoded.categories {
                let indicator: Vec<i32> = cells
                    .into_iter()
                    .map(|cell| i32::from(cell == Some(category.as_str())))
                    .collect();
                columns.push(Column::new(encoded.indicator_name(category).into(), indicator));
            }
        }

        Ok(DataFrame::new(columns)?)
    }

    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.source.as_str())
    }

    pub fn indicator_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(|c| c.categories.iter().map(|cat| c.indicator_name(cat)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(frame: &DataFrame, name: &str) -> Vec<Option<i32>> {
        frame
            .column(name)
            .expect("column exists")
            .as_materialized_series()
            .i32()
            .expect("indicator column")
            .into_iter()
            .collect()
    }

    #[test]
    fn test_reference_categories_drive_customer_encoding() -> Result<()> {
        let reference = df!(
            "TYPE" => &["A", "B", "A"],
            "NUM" => &[1.0, 2.0, 3.0]
        )?;
        let customer = df!(
            "TYPE" => &["A", "A"],
            "NUM" => &[4.0, 5.0]
        )?;

        let encoding = CategoricalEncoding::fit(&reference)?;
        let reference = encoding.transform(&reference)?;
        let customer = encoding.transform(&customer)?;

        for frame in [&reference, &customer] {
            let names: Vec<String> = frame
                .get_column_names()
                .into_iter()
                .map(|n| n.to_string())
                .collect();
            assert_eq!(names, vec!["NUM", "TYPE_A", "TYPE_B"]);
        }
        assert_eq!(ints(&reference, "TYPE_B"), vec![Some(0), Some(1), Some(0)]);
        assert_eq!(ints(&customer, "TYPE_A"), vec![Some(1), Some(1)]);
        assert_eq!(ints(&customer, "TYPE_B"), vec![Some(0), Some(0)]);
        Ok(())
    }

    #[test]
    fn test_unseen_customer_values_get_no_column() -> Result<()> {
        let reference = df!("OST_WEST_KZ" => &["O", "W"])?;
        let customer = df!("OST_WEST_KZ" => &[Some("W"), Some("Z"), None])?;

        let encoding = CategoricalEncoding::fit(&reference)?;
        let customer = encoding.transform(&customer)?;

        assert!(customer.column("OST_WEST_KZ_Z").is_err());
        assert_eq!(ints(&customer, "OST_WEST_KZ_O"), vec![Some(0), Some(0), Some(0)]);
        assert_eq!(ints(&customer, "OST_WEST_KZ_W"), vec![Some(1), Some(0), Some(0)]);
        Ok(())
    }

    #[test]
    fn test_numeric_only_frame_is_unchanged() -> Result<()> {
        let frame = df!("A" => &[1i64, 2], "B" => &[0.5, 1.5])?;
        let encoding = CategoricalEncoding::fit(&frame)?;
        assert!(encoding.is_empty());
        let encoded = encoding.transform(&frame)?;
        assert!(encoded.equals_missing(&frame));
        Ok(())
    }

    #[test]
    fn test_indicator_name_collision_is_reported() -> Result<()> {
        let reference = df!("TYPE" => &["A", "B"], "TYPE_A" => &[1.0, 2.0])?;
        let encoding = CategoricalEncoding::fit(&reference)?;
        let err = encoding.transform(&reference).expect_err("TYPE_A exists twice");
        assert!(
            matches!(err, CleanError::SchemaMismatch(ref msg) if msg.contains("'TYPE_A'")),
            "unexpected error {err}"
        );
        Ok(())
    }

    #[test]
    fn test_indicator_columns_listing() -> Result<()> {
        let reference = df!("TYPE" => &[Some("B"), None, Some("A")])?;
        let encoding = CategoricalEncoding::fit(&reference)?;
        assert_eq!(encoding.indicator_columns(), vec!["TYPE_A", "TYPE_B"]);
        assert_eq!(encoding.source_columns().collect::<Vec<_>>(), vec!["TYPE"]);
        Ok(())
    }
}
