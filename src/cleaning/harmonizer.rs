//! Column harmonization between the reference and customer tables.
//!
//! Every drop decision is computed once, as a set of column names, and then
//! applied to both tables. Neither table is ever pruned on its own.

use super::catalog::AttributeCatalog;
use crate::error::Result;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Transaction-count columns that are absent from the metadata table but
/// still carry usable data.
pub const TRANSACTION_COLUMNS: [&str; 33] = [
    "D19_BANKEN_DIREKT",
    "D19_BANKEN_GROSS",
    "D19_BANKEN_LOKAL",
    "D19_BANKEN_REST",
    "D19_BEKLEIDUNG_GEH",
    "D19_BEKLEIDUNG_REST",
    "D19_BILDUNG",
    "D19_BIO_OEKO",
    "D19_DIGIT_SERV",
    "D19_DROGERIEARTIKEL",
    "D19_ENERGIE",
    "D19_FREIZEIT",
    "D19_GARTEN",
    "D19_HANDWERK",
    "D19_HAUS_DEKO",
    "D19_KINDERARTIKEL",
    "D19_KOSMETIK",
    "D19_LEBENSMITTEL",
    "D19_LOTTO",
    "D19_NAHRUNGSERGAENZUNG",
    "D19_RATGEBER",
    "D19_REISEN",
    "D19_SAMMELARTIKEL",
    "D19_SCHUHE",
    "D19_SONSTIGE",
    "D19_TECHNIK",
    "D19_TELKO_MOBILE",
    "D19_TELKO_REST",
    "D19_TIERARTIKEL",
    "D19_VERSAND_REST",
    "D19_VERSICHERUNGEN",
    "D19_VOLLSORTIMENT",
    "D19_WEIN_FEINKOST",
];

pub fn column_names(frame: &DataFrame) -> Vec<String> {
    frame
        .get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Columns of either table that are neither catalog attributes nor on the
/// allow-list.
pub fn undescribed_columns(
    reference: &DataFrame,
    customer: &DataFrame,
    catalog: &AttributeCatalog,
    allow_list: &[String],
) -> BTreeSet<String> {
    column_names(reference)
        .into_iter()
        .chain(column_names(customer))
        .filter(|name| !catalog.contains(name) && !allow_list.contains(name))
        .collect()
}

/// Columns whose share of nulls is strictly above `threshold`.
pub fn sparse_columns(frame: &DataFrame, threshold: f64) -> BTreeSet<String> {
    if frame.height() == 0 {
        return BTreeSet::new();
    }
    let height = frame.height() as f64;
    frame
        .get_columns()
        .iter()
        .filter(|column| {
            let fraction = column.null_count() as f64 / height;
            fraction > threshold
        })
        .map(|column| column.name().to_string())
        .collect()
}

/// Columns present in one table but not the other.
pub fn unshared_columns(reference: &DataFrame, customer: &DataFrame) -> BTreeSet<String> {
    let left: BTreeSet<String> = column_names(reference).into_iter().collect();
    let right: BTreeSet<String> = column_names(customer).into_iter().collect();
    left.symmetric_difference(&right).cloned().collect()
}

/// Drops the named columns; names not in the frame are ignored.
pub fn drop_columns(frame: &DataFrame, drop: &BTreeSet<String>) -> Result<DataFrame> {
    let keep: Vec<String> = column_names(frame)
        .into_iter()
        .filter(|name| !drop.contains(name))
        .collect();
    Ok(frame.select(keep)?)
}

/// Applies one drop set to both tables and lines the customer columns up
/// with the reference. Columns only one table has are dropped as well, so
/// both results carry exactly the same columns in the same order.
pub fn harmonize(
    reference: &DataFrame,
    customer: &DataFrame,
    drop: &BTreeSet<String>,
) -> Result<(DataFrame, DataFrame)> {
    let customer_names: BTreeSet<String> = column_names(customer).into_iter().collect();
    let keep: Vec<String> = column_names(reference)
        .into_iter()
        .filter(|name| !drop.contains(name) && customer_names.contains(name))
        .collect();

    tracing::debug!(
        "Harmonized schema keeps {} of {} reference columns",
        keep.len(),
        reference.width()
    );
    Ok((reference.select(keep.clone())?, customer.select(keep)?))
}

/// Names from `drop` that actually exist in at least one of the tables.
pub fn present_in_either(
    drop: &BTreeSet<String>,
    reference: &DataFrame,
    customer: &DataFrame,
) -> Vec<String> {
    let present: BTreeSet<String> = column_names(reference)
        .into_iter()
        .chain(column_names(customer))
        .collect();
    drop.intersection(&present).cloned().collect()
}
