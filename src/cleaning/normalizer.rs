//! Value normalization: turns codes the metadata does not allow, and codes
//! it flags as unknown, into nulls.

use super::catalog::{AttributeCatalog, LegitimateValues, as_code, parse_code};
use crate::error::{CleanError, Result};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Nulls every cell that is not a legitimate value of the column's attribute.
///
/// Numeric columns come back as `Float64`, and so do text columns of an
/// attribute that lists no text labels. Running this twice gives the same
/// column as running it once.
pub fn normalize_column(column: &Column, legitimate: &LegitimateValues) -> Result<Column> {
    let series = column.as_materialized_series();
    let name = series.name().clone();

    let normalized = if series.dtype().is_primitive_numeric() {
        let casted = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = casted
            .f64()?
            .into_iter()
            .map(|cell| cell.filter(|v| legitimate.contains_number(*v)))
            .collect();
        Series::new(name, values)
    } else if is_textual(series.dtype()) && legitimate.labels.is_empty() {
        // Only codes are listed, so every surviving cell parses as a number.
        let casted = series.cast(&DataType::String)?;
        let values: Vec<Option<f64>> = casted
            .str()?
            .into_iter()
            .map(|cell| {
                cell.filter(|v| legitimate.contains_label(v))
                    .and_then(|v| v.trim().parse::<f64>().ok())
            })
            .collect();
        Series::new(name, values)
    } else if is_textual(series.dtype()) {
        let casted = series.cast(&DataType::String)?;
        let values: Vec<Option<&str>> = casted
            .str()?
            .into_iter()
            .map(|cell| cell.filter(|v| legitimate.contains_label(v)))
            .collect();
        Series::new(name, values)
    } else {
        tracing::debug!("Column {name} has dtype {}, left as is", series.dtype());
        series.clone()
    };

    Ok(normalized.into_column())
}

/// Nulls every cell whose value is one of the attribute's unknown codes.
/// Everything else, including existing nulls, is kept.
pub fn normalize_unknowns(column: &Column, unknown: &BTreeSet<i64>) -> Result<Column> {
    if unknown.is_empty() {
        return Ok(column.clone());
    }
    let series = column.as_materialized_series();
    let name = series.name().clone();
    let is_unknown = |code: Option<i64>| code.is_some_and(|c| unknown.contains(&c));

    let normalized = if series.dtype().is_primitive_numeric() {
        let casted = series.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = casted
            .f64()?
            .into_iter()
            .map(|cell| cell.filter(|v| !is_unknown(as_code(*v))))
            .collect();
        Series::new(name, values)
    } else if is_textual(series.dtype()) {
        let casted = series.cast(&DataType::String)?;
        let values: Vec<Option<&str>> = casted
            .str()?
            .into_iter()
            .map(|cell| cell.filter(|v| !is_unknown(parse_code(v))))
            .collect();
        Series::new(name, values)
    } else {
        series.clone()
    };

    Ok(normalized.into_column())
}

/// Text columns in which every non-null cell is a number, as `Float64`.
/// Anything else is returned unchanged.
pub fn numeric_text_to_float(column: &Column) -> Result<Column> {
    if !is_textual(column.dtype()) {
        return Ok(column.clone());
    }
    let series = column.as_materialized_series();
    let casted = series.cast(&DataType::String)?;
    let cells = casted.str()?;
    let values: Option<Vec<Option<f64>>> = cells
        .into_iter()
        .map(|cell| match cell {
            Some(v) => v.trim().parse::<f64>().ok().map(Some),
            None => Some(None),
        })
        .collect();

    Ok(match values {
        Some(values) => {
            tracing::debug!("Column {} holds only numbers, read as Float64", series.name());
            Series::new(series.name().clone(), values).into_column()
        }
        None => column.clone(),
    })
}

/// Runs the legitimate-value pass and then the unknown-value pass over every
/// column named in the catalog. Text columns holding only numbers are turned
/// into `Float64` first, so both tables agree on numeric dtypes whichever way
/// their files were read. Other columns are passed through.
pub fn normalize_frame(frame: &DataFrame, catalog: &AttributeCatalog) -> Result<DataFrame> {
    let mut normalized = 0usize;
    let columns = frame
        .get_columns()
        .iter()
        .map(|column| {
            let Some(entry) = catalog.get(column.name().as_str()) else {
                return numeric_text_to_float(column);
            };
            normalized += 1;
            let column = match &entry.legitimate {
                Some(legitimate) => normalize_column(column, legitimate)?,
                None => numeric_text_to_float(column)?,
            };
            normalize_unknowns(&column, &entry.unknown)
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!("Normalized {normalized} of {} columns", frame.width());
    Ok(DataFrame::new(columns)?)
}

/// Replaces placeholder strings (e.g. `X`/`XX` in `CAMEO_DEUG_2015`) with
/// nulls and casts the column to `Float64`. Columns not in the frame are
/// skipped.
///
/// # Errors
///
/// `DataProcessing` if a cell is still not numeric once placeholders are gone.
pub fn replace_placeholders(
    frame: &DataFrame,
    placeholders: &BTreeMap<String, Vec<String>>,
) -> Result<DataFrame> {
    let columns = frame
        .get_columns()
        .iter()
        .map(|column| {
            let name = column.name().as_str();
            match placeholders.get(name) {
                Some(codes) if is_textual(column.dtype()) => strip_placeholders(column, codes),
                _ => Ok(column.clone()),
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

fn strip_placeholders(column: &Column, codes: &[String]) -> Result<Column> {
    let series = column.as_materialized_series();
    let name = series.name().clone();
    let casted = series.cast(&DataType::String)?;
    let values: Vec<Option<&str>> = casted
        .str()?
        .into_iter()
        .map(|cell| cell.filter(|v| !codes.iter().any(|code| code == v.trim())))
        .collect();

    let stripped = Series::new(name.clone(), values)
        .strict_cast(&DataType::Float64)
        .map_err(|e| {
            CleanError::DataProcessing(format!(
                "column '{name}' is not numeric after removing placeholders: {e}"
            ))
        })?;
    Ok(stripped.into_column())
}

pub(crate) fn is_textual(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(..))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::catalog::{CatalogOptions, MetadataRow};

    fn legit(tokens: &[&str]) -> LegitimateValues {
        LegitimateValues::from_tokens(tokens.iter().copied())
    }

    fn floats(column: &Column) -> Vec<Option<f64>> {
        column
            .as_materialized_series()
            .f64()
            .expect("float column")
            .into_iter()
            .collect()
    }

    #[test]
    fn test_normalize_column_nulls_strange_values() -> Result<()> {
        let column = Column::new("FINANZTYP".into(), &[Some(1i64), Some(7), None, Some(-1)]);
        let normalized = normalize_column(&column, &legit(&["-1", "1", "2"]))?;
        assert_eq!(floats(&normalized), vec![Some(1.0), None, None, Some(-1.0)]);
        Ok(())
    }

    #[test]
    fn test_normalize_column_is_idempotent() -> Result<()> {
        let values = legit(&["-1, 0", "1", "2", "3"]);
        let column = Column::new(
            "SEMIO_SOZ".into(),
            &[Some(0.0), Some(3.0), Some(2.5), Some(f64::NAN), None, Some(12.0)],
        );
        let once = normalize_column(&column, &values)?;
        let twice = normalize_column(&once, &values)?;
        assert!(once.as_materialized_series().equals_missing(twice.as_materialized_series()));
        assert_eq!(
            floats(&once),
            vec![Some(0.0), Some(3.0), None, None, None, None]
        );
        Ok(())
    }

    #[test]
    fn test_normalize_column_text_labels() -> Result<()> {
        let column = Column::new(
            "OST_WEST_KZ".into(),
            &[Some("O"), Some("W"), Some("-1"), Some("Q"), None],
        );
        let normalized = normalize_column(&column, &legit(&["-1", "O", "W"]))?;
        let cells: Vec<Option<&str>> = normalized
            .as_materialized_series()
            .str()?
            .into_iter()
            .collect();
        assert_eq!(cells, vec![Some("O"), Some("W"), Some("-1"), None, None]);
        Ok(())
    }

    #[test]
    fn test_normalize_unknowns_keeps_other_values() -> Result<()> {
        let column = Column::new("AGER_TYP".into(), &[Some(-1.0), Some(0.0), Some(2.0), None]);
        let normalized = normalize_unknowns(&column, &BTreeSet::from([-1, 0]))?;
        assert_eq!(floats(&normalized), vec![None, None, Some(2.0), None]);
        Ok(())
    }

    #[test]
    fn test_normalize_frame_age_scenario() -> Result<()> {
        let rows = vec![
            MetadataRow::new(Some("AGE"), Some("-1"), Some("unknown")),
            MetadataRow::new(Some("AGE"), Some("1..99"), Some("valid")),
        ];
        let catalog = AttributeCatalog::from_rows(&rows, &CatalogOptions::default())?;
        let frame = df!(
            "AGE" => &[-1i64, 5, 99],
            "LNR" => &[10i64, 11, 12]
        )?;

        let normalized = normalize_frame(&frame, &catalog)?;
        assert_eq!(
            floats(normalized.column("AGE")?),
            vec![None, Some(5.0), Some(99.0)]
        );
        assert!(
            normalized
                .column("LNR")?
                .as_materialized_series()
                .equals(frame.column("LNR")?.as_materialized_series())
        );
        assert_eq!(frame.column("AGE")?.null_count(), 0, "input must be untouched");
        Ok(())
    }

    #[test]
    fn test_code_only_text_column_becomes_float() -> Result<()> {
        let column = Column::new("AGE".into(), &[Some("20"), Some("X"), Some(" 40"), None]);
        let normalized = normalize_column(&column, &legit(&["-1", "1...99"]))?;
        assert_eq!(normalized.dtype(), &DataType::Float64);
        assert_eq!(floats(&normalized), vec![Some(20.0), None, Some(40.0), None]);
        Ok(())
    }

    #[test]
    fn test_numeric_text_to_float() -> Result<()> {
        let numbers = Column::new("D19_LOTTO".into(), &[Some("0"), None, Some("1")]);
        let converted = numeric_text_to_float(&numbers)?;
        assert_eq!(floats(&converted), vec![Some(0.0), None, Some(1.0)]);

        let labels = Column::new("OST_WEST_KZ".into(), &[Some("O"), Some("1")]);
        assert_eq!(numeric_text_to_float(&labels)?.dtype(), &DataType::String);
        Ok(())
    }

    #[test]
    fn test_replace_placeholders() -> Result<()> {
        let frame = df!(
            "CAMEO_DEUG_2015" => &[Some("8"), Some("X"), Some("XX"), None, Some("4")],
            "OTHER" => &["X", "X", "X", "X", "X"]
        )?;
        let mut codes = BTreeMap::new();
        codes.insert("CAMEO_DEUG_2015".to_owned(), vec!["X".to_owned(), "XX".to_owned()]);
        codes.insert("MISSING".to_owned(), vec!["X".to_owned()]);

        let cleaned = replace_placeholders(&frame, &codes)?;
        assert_eq!(
            floats(cleaned.column("CAMEO_DEUG_2015")?),
            vec![Some(8.0), None, None, None, Some(4.0)]
        );
        assert_eq!(cleaned.column("OTHER")?.dtype(), &DataType::String);
        Ok(())
    }

    #[test]
    fn test_replace_placeholders_rejects_leftover_text() -> Result<()> {
        let frame = df!("CAMEO_DEUG_2015" => &["8", "X", "unexpected"])?;
        let mut codes = BTreeMap::new();
        codes.insert("CAMEO_DEUG_2015".to_owned(), vec!["X".to_owned()]);
        let err = replace_placeholders(&frame, &codes).expect_err("leftover text must fail");
        assert!(matches!(err, CleanError::DataProcessing(_)));
        Ok(())
    }
}
