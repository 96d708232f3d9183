//! Attribute-driven cleaning of a reference table and a customer table.
//!
//! The metadata table is parsed into an [`AttributeCatalog`], which drives the
//! value normalization. Columns are then harmonized across both tables, rows
//! are pruned, text columns one-hot encoded and the remaining nulls imputed.
//! [`clean_tables`] runs all of it in order.

pub mod catalog;
pub mod encoder;
pub mod harmonizer;
pub mod imputer;
pub mod normalizer;
pub mod pipeline;
pub mod pruner;


pub use catalog::{AttributeCatalog, AttributeEntry, CatalogOptions, LegitimateValues, MetadataRow};
pub use encoder::CategoricalEncoding;
pub use imputer::EmptyColumnPolicy;
pub use pipeline::{CleanedTables, CleaningReport, StageRecord, TableShape, clean_tables};
