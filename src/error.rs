//! Centralized error handling for attrclean.
//!
//! Library functions return [`Result<T>`] carrying a [`CleanError`]. The
//! variants mirror the failure classes of the cleaning pipeline:
//!
//! ```
//! use attrclean::error::CleanError;
//!
//! fn describe(err: &CleanError) -> &'static str {
//!     match err {
//!         CleanError::MetadataParse { .. } => "fix the metadata table",
//!         CleanError::ImputationUndefined { .. } => "choose an empty column policy",
//!         _ => "see the log",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any result whose error converts
//! into a `CleanError`:
//!
//! ```no_run
//! use attrclean::error::ResultExt as _;
//!
//! fn read_config() -> attrclean::error::Result<String> {
//!     std::fs::read_to_string("clean.json").context("Failed to read cleaning config")
//! }
//! ```

use std::fmt;

/// Main error type for attrclean operations.
#[derive(Debug)]
pub enum CleanError {
    /// I/O errors (reading or writing tables, configs, logs)
    Io(std::io::Error),

    /// Polars failures and other data processing errors
    DataProcessing(String),

    /// A metadata `Value` that must be an integer code is not one
    MetadataParse { attribute: String, token: String },

    /// A required fixed column is missing from an input table
    SchemaMismatch(String),

    /// Mean imputation on a column without a single non-missing cell
    ImputationUndefined { column: String },

    /// Invalid configuration
    Config(String),

    /// Generic error with context
    Other(String),
}

impl fmt::Display for CleanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::DataProcessing(msg) => write!(f, "Data processing error: {msg}"),
            Self::MetadataParse { attribute, token } => write!(
                f,
                "Metadata parse error: attribute '{attribute}' has non-integer unknown value '{token}'"
            ),
            Self::SchemaMismatch(msg) => write!(f, "Schema mismatch: {msg}"),
            Self::ImputationUndefined { column } => write!(
                f,
                "Imputation undefined: column '{column}' has no values to take a mean from"
            ),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CleanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CleanError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<anyhow::Error> for CleanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<serde_json::Error> for CleanError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<polars::error::PolarsError> for CleanError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

/// Result type alias for attrclean operations.
pub type Result<T> = std::result::Result<T, CleanError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CleanError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: CleanError = e.into();
            CleanError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: CleanError = e.into();
            CleanError::Other(format!("{}: {}", f(), err))
        })
    }
}
