//! # attrclean
//!
//! Cleans a general-population (reference) table and a customer table that
//! share one column schema, driven by a metadata table describing each
//! attribute's codes.
//!
//! ## Quick Start
//!
//! ```no_run
//! use attrclean::cleaning::clean_tables;
//! use attrclean::config::CleaningConfig;
//! use attrclean::io::load_df;
//! use std::path::Path;
//!
//! # fn example() -> attrclean::error::Result<()> {
//! let reference = load_df(Path::new("azdias.csv"))?;
//! let customer = load_df(Path::new("customers.csv"))?;
//! let metadata = load_df(Path::new("attributes.csv"))?;
//!
//! let cleaned = clean_tables(&reference, &customer, &metadata, &CleaningConfig::default())?;
//! println!("{}", cleaned.report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`cleaning`]: the cleaning stages and the pipeline running them
//!   - [`cleaning::catalog`]: metadata parsing into an attribute catalog
//!   - [`cleaning::normalizer`]: illegitimate and unknown codes to nulls
//!   - [`cleaning::harmonizer`]: column drops applied to both tables
//!   - [`cleaning::pruner`]: row pruning by null count
//!   - [`cleaning::encoder`]: one-hot encoding fitted on the reference table
//!   - [`cleaning::imputer`]: mean imputation
//! - [`config`]: cleaning settings, loadable from JSON
//! - [`error`]: error type and `Result` alias
//! - [`io`]: table loading and saving
//! - [`logging`]: tracing setup
//!
//! Missing values are polars nulls throughout. Every stage takes a
//! `&DataFrame` and returns a new one.

pub mod cleaning;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
