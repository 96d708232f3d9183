//! Integration tests for the full cleaning workflow
//!
//! These tests load the fixture tables under `testdata/`, run every
//! cleaning stage and check the cleaned tables and the report.

use anyhow::Result;
use attrclean::cleaning::{CleanedTables, clean_tables};
use attrclean::config::CleaningConfig;
use attrclean::io::{load_df, save_df};
use polars::prelude::*;
use std::path::Path;

fn clean_fixtures(config: &CleaningConfig) -> Result<CleanedTables> {
    let reference = load_df(Path::new("testdata/azdias.csv"))?;
    let customer = load_df(Path::new("testdata/customers.csv"))?;
    let metadata = load_df(Path::new("testdata/attributes.csv"))?;
    Ok(clean_tables(&reference, &customer, &metadata, config)?)
}

fn names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect()
}

fn dropped(cleaned: &CleanedTables, stage: &str) -> Vec<String> {
    cleaned
        .report
        .stage(stage)
        .map(|s| s.dropped_columns.clone())
        .unwrap_or_default()
}

#[test]
fn test_clean_fixture_tables() -> Result<()> {
    let cleaned = clean_fixtures(&CleaningConfig::default())?;

    let expected = vec![
        "AGER_TYP",
        "ALTERSKATEGORIE_GROB",
        "ANREDE_KZ",
        "CAMEO_DEUG_2015",
        "GEBURTSJAHR",
        "D19_LOTTO",
        "OST_WEST_KZ_O",
        "OST_WEST_KZ_W",
    ];
    assert_eq!(names(&cleaned.reference), expected);
    assert_eq!(names(&cleaned.customer), expected, "Both tables share one schema");

    assert_eq!(cleaned.reference.height(), 10, "No reference row exceeds 50 nulls");
    assert_eq!(cleaned.customer.height(), 6, "No customer row exceeds 50 nulls");

    for frame in [&cleaned.reference, &cleaned.customer] {
        let nulls: usize = frame.get_columns().iter().map(Column::null_count).sum();
        assert_eq!(nulls, 0, "Imputation should leave no nulls");
    }
    Ok(())
}

#[test]
fn test_report_lists_dropped_columns() -> Result<()> {
    let cleaned = clean_fixtures(&CleaningConfig::default())?;

    assert_eq!(dropped(&cleaned, "excluded_columns"), vec!["CAMEO_DEU_2015"]);
    assert_eq!(
        dropped(&cleaned, "undescribed_columns"),
        vec![
            "ALTER_KIND1",
            "CUSTOMER_GROUP",
            "LNR",
            "ONLINE_PURCHASE",
            "PRODUCT_GROUP"
        ]
    );
    // 40% missing in the reference table only, still dropped from both.
    assert_eq!(dropped(&cleaned, "sparse_columns"), vec!["KBA05_ANTG1"]);
    assert!(dropped(&cleaned, "unshared_columns").is_empty());
    Ok(())
}

#[test]
fn test_unknown_codes_are_imputed() -> Result<()> {
    let cleaned = clean_fixtures(&CleaningConfig::default())?;

    let ager: Vec<Option<f64>> = cleaned
        .reference
        .column("AGER_TYP")?
        .as_materialized_series()
        .f64()?
        .into_iter()
        .collect();
    // Mean of the eight known codes: 13 / 8.
    assert_eq!(ager.first().copied().flatten(), Some(1.625));
    assert_eq!(ager.get(7).copied().flatten(), Some(0.0), "0 is a listed code");
    Ok(())
}

#[test]
fn test_customer_without_east_flag_gets_zero_column() -> Result<()> {
    let cleaned = clean_fixtures(&CleaningConfig::default())?;

    let east = cleaned.customer.column("OST_WEST_KZ_O")?;
    assert_eq!(east.dtype(), &DataType::Int32);
    let ones = east
        .as_materialized_series()
        .i32()?
        .into_iter()
        .filter(|v| *v == Some(1))
        .count();
    assert_eq!(ones, 0, "No customer lives in the east");
    Ok(())
}

#[test]
fn test_strict_row_pruning() -> Result<()> {
    let config = CleaningConfig {
        row_null_threshold: 0,
        ..Default::default()
    };
    let cleaned = clean_fixtures(&config)?;

    let pruning = cleaned
        .report
        .stage("row_pruning")
        .cloned()
        .unwrap_or_default();
    assert_eq!(pruning.reference_rows_removed, 6);
    assert_eq!(pruning.customer_rows_removed, 1);
    assert_eq!(cleaned.reference.height(), 4);
    assert_eq!(cleaned.customer.height(), 5);
    Ok(())
}

#[test]
fn test_cleaned_tables_round_trip_through_parquet() -> Result<()> {
    let mut cleaned = clean_fixtures(&CleaningConfig::default())?;
    let temp = tempfile::tempdir()?;
    let path = temp.path().join("customers_clean.parquet");

    save_df(&mut cleaned.customer, &path)?;
    let loaded = load_df(&path)?;
    assert!(loaded.equals_missing(&cleaned.customer));
    Ok(())
}

#[test]
fn test_missing_metadata_column_is_schema_mismatch() -> Result<()> {
    let reference = load_df(Path::new("testdata/azdias.csv"))?;
    let customer = load_df(Path::new("testdata/customers.csv"))?;
    let metadata = load_df(Path::new("testdata/attributes.csv"))?.drop("Meaning")?;

    let err = clean_tables(&reference, &customer, &metadata, &CleaningConfig::default())
        .expect_err("metadata without Meaning");
    assert!(
        matches!(err, attrclean::error::CleanError::SchemaMismatch(_)),
        "unexpected error {err}"
    );
    Ok(())
}
