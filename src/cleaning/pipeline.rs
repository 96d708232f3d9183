//! End-to-end cleaning of a reference and a customer table.
//!
//! Stage order is fixed:
//!
//! ```text
//! excluded columns
//!   -> attribute catalog (from metadata)
//!   -> undescribed columns (optional)
//!   -> placeholder codes
//!   -> legitimate / unknown normalization
//!   -> sparse and unshared columns
//!   -> row pruning
//!   -> categorical encoding
//!   -> empty column policy
//!   -> mean imputation
//! ```
//!
//! Every column drop is decided once and applied to both tables. Row pruning
//! is the only stage that treats the tables separately.

use super::catalog::AttributeCatalog;
use super::encoder::CategoricalEncoding;
use super::harmonizer::{
    drop_columns, harmonize, present_in_either, sparse_columns, undescribed_columns,
    unshared_columns,
};
use super::imputer::{EmptyColumnPolicy, empty_numeric_columns, impute_means};
use super::normalizer::{normalize_frame, replace_placeholders};
use super::pruner::prune_rows;
use crate::config::CleaningConfig;
use crate::error::Result;
use chrono::{DateTime, Local};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TableShape {
    pub rows: usize,
    pub columns: usize,
}

impl TableShape {
    pub fn of(frame: &DataFrame) -> Self {
        Self {
            rows: frame.height(),
            columns: frame.width(),
        }
    }
}

/// What one stage removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageRecord {
    pub stage: String,
    pub dropped_columns: Vec<String>,
    pub reference_rows_removed: usize,
    pub customer_rows_removed: usize,
}

impl StageRecord {
    fn columns(stage: &str, dropped_columns: Vec<String>) -> Self {
        Self {
            stage: stage.to_owned(),
            dropped_columns,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub reference_before: TableShape,
    pub reference_after: TableShape,
    pub customer_before: TableShape,
    pub customer_after: TableShape,
    pub stages: Vec<StageRecord>,
    pub duration: Duration,
    pub timestamp: DateTime<Local>,
}

impl CleaningReport {
    /// Create a summary message
    pub fn summary(&self) -> String {
        let dropped: usize = self.stages.iter().map(|s| s.dropped_columns.len()).sum();
        format!(
            "Cleaning completed: reference {}x{} -> {}x{}, customer {}x{} -> {}x{}, {} columns dropped, {:.2}s",
            self.reference_before.rows,
            self.reference_before.columns,
            self.reference_after.rows,
            self.reference_after.columns,
            self.customer_before.rows,
            self.customer_before.columns,
            self.customer_after.rows,
            self.customer_after.columns,
            dropped,
            self.duration.as_secs_f64()
        )
    }

    /// The record of the named stage, if it ran.
    pub fn stage(&self, name: &str) -> Option<&StageRecord> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

/// Both cleaned tables plus the report of how they got there. The two tables
/// always have the same column names in the same order.
#[derive(Debug, Clone)]
pub struct CleanedTables {
    pub reference: DataFrame,
    pub customer: DataFrame,
    pub catalog: AttributeCatalog,
    pub encoding: CategoricalEncoding,
    pub report: CleaningReport,
}

struct Tables {
    reference: DataFrame,
    customer: DataFrame,
    stages: Vec<StageRecord>,
}

impl Tables {
    /// Drops one column set from both tables without lining them up.
    fn drop_from_both(&mut self, stage: &str, drop: &BTreeSet<String>) -> Result<()> {
        let dropped = present_in_either(drop, &self.reference, &self.customer);
        self.reference = drop_columns(&self.reference, drop)?;
        self.customer = drop_columns(&self.customer, drop)?;
        self.record_columns(stage, dropped);
        Ok(())
    }

    fn record_columns(&mut self, stage: &str, dropped: Vec<String>) {
        tracing::info!("Stage {stage}: dropped {} columns", dropped.len());
        if !dropped.is_empty() {
            tracing::debug!("Stage {stage} dropped: {}", dropped.join(", "));
        }
        self.stages.push(StageRecord::columns(stage, dropped));
    }

    fn map_both(&mut self, f: impl Fn(&DataFrame) -> Result<DataFrame>) -> Result<()> {
        self.reference = f(&self.reference)?;
        self.customer = f(&self.customer)?;
        Ok(())
    }
}

/// Runs every cleaning stage over `reference` and `customer`, driven by the
/// attribute catalog parsed from `metadata`. The inputs are not modified.
///
/// # Errors
///
/// - `SchemaMismatch` if the metadata lacks its `Attribute`/`Value`/`Meaning` columns
/// - `MetadataParse` if an unknown-meaning value is not an integer code
/// - `ImputationUndefined` if a numeric column ends up with no values and the
///   policy is [`EmptyColumnPolicy::Fail`]
/// - `Config` if the config does not validate
pub fn clean_tables(
    reference: &DataFrame,
    customer: &DataFrame,
    metadata: &DataFrame,
    config: &CleaningConfig,
) -> Result<CleanedTables> {
    config.validate()?;
    let start = Instant::now();
    let reference_before = TableShape::of(reference);
    let customer_before = TableShape::of(customer);

    tracing::info!(
        "Cleaning reference {}x{} and customer {}x{}",
        reference_before.rows,
        reference_before.columns,
        customer_before.rows,
        customer_before.columns
    );

    let mut tables = Tables {
        reference: reference.clone(),
        customer: customer.clone(),
        stages: Vec::new(),
    };

    let excluded: BTreeSet<String> = config.excluded_columns.iter().cloned().collect();
    tables.drop_from_both("excluded_columns", &excluded)?;

    let catalog = AttributeCatalog::from_frame(metadata, &config.catalog_options())?;
    let absent = catalog
        .attribute_names()
        .filter(|name| tables.reference.column(name).is_err())
        .count();
    tracing::debug!("{absent} catalog attributes have no reference column");

    if config.drop_unknown_columns {
        let undescribed = undescribed_columns(
            &tables.reference,
            &tables.customer,
            &catalog,
            &config.transaction_columns,
        );
        tables.drop_from_both("undescribed_columns", &undescribed)?;
    }

    tables.map_both(|frame| replace_placeholders(frame, &config.placeholder_codes))?;
    tables.map_both(|frame| normalize_frame(frame, &catalog))?;

    drop_sparse_columns(&mut tables, config.column_null_threshold)?;
    prune_both(&mut tables, config.row_null_threshold)?;

    let encoding = CategoricalEncoding::fit(&tables.reference)?;
    tables.map_both(|frame| encoding.transform(frame))?;
    tables.record_columns(
        "categorical_encoding",
        encoding.source_columns().map(str::to_owned).collect(),
    );

    if config.empty_column_policy == EmptyColumnPolicy::Drop {
        let mut empty = empty_numeric_columns(&tables.reference);
        empty.extend(empty_numeric_columns(&tables.customer));
        tables.drop_from_both("empty_columns", &empty)?;
    }

    let policy = config.empty_column_policy;
    tables.map_both(|frame| impute_means(frame, policy))?;

    let report = CleaningReport {
        reference_before,
        reference_after: TableShape::of(&tables.reference),
        customer_before,
        customer_after: TableShape::of(&tables.customer),
        stages: tables.stages,
        duration: start.elapsed(),
        timestamp: Local::now(),
    };
    tracing::info!("{}", report.summary());

    Ok(CleanedTables {
        reference: tables.reference,
        customer: tables.customer,
        catalog,
        encoding,
        report,
    })
}

/// Drops columns that are too sparse in either table, together with columns
/// only one table has.
fn drop_sparse_columns(tables: &mut Tables, threshold: f64) -> Result<()> {
    let mut sparse = sparse_columns(&tables.reference, threshold);
    sparse.extend(sparse_columns(&tables.customer, threshold));
    let unshared = unshared_columns(&tables.reference, &tables.customer);

    let sparse_dropped = present_in_either(&sparse, &tables.reference, &tables.customer);
    let (reference, customer) = harmonize(&tables.reference, &tables.customer, &sparse)?;
    tables.reference = reference;
    tables.customer = customer;

    tables.record_columns("sparse_columns", sparse_dropped);
    let unshared_only: Vec<String> = unshared.difference(&sparse).cloned().collect();
    tables.record_columns("unshared_columns", unshared_only);
    Ok(())
}

fn prune_both(tables: &mut Tables, max_nulls: u32) -> Result<()> {
    let reference = prune_rows(&tables.reference, max_nulls)?;
    let customer = prune_rows(&tables.customer, max_nulls)?;

    tables.stages.push(StageRecord {
        stage: "row_pruning".to_owned(),
        dropped_columns: Vec::new(),
        reference_rows_removed: tables.reference.height() - reference.height(),
        customer_rows_removed: tables.customer.height() - customer.height(),
    });
    tables.reference = reference;
    tables.customer = customer;
    Ok(())
}
