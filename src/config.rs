use crate::cleaning::catalog::{CatalogOptions, DEFAULT_ELLIPSIS_MARKERS, DEFAULT_UNKNOWN_MEANINGS};
use crate::cleaning::harmonizer::TRANSACTION_COLUMNS;
use crate::cleaning::imputer::EmptyColumnPolicy;
use crate::error::{CleanError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Columns dropped from both tables before anything else. The coarser
/// `CAMEO_DEUG_2015` carries the same classification.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 2] = ["CAMEO_DEU_2015", "CAMEO_INTL_2015"];

/// Historical row threshold of the cleaning runs.
pub const DEFAULT_ROW_NULL_THRESHOLD: u32 = 50;

pub const DEFAULT_COLUMN_NULL_THRESHOLD: f64 = 0.3;

/// Settings for one cleaning run. Every field has a default, so a config
/// file only needs the values it changes:
///
/// ```json
/// { "column_null_threshold": 0.25, "empty_column_policy": "drop" }
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct CleaningConfig {
    /// Largest share of nulls a column may have in either table
    pub column_null_threshold: f64,
    /// Largest number of nulls a row may have
    pub row_null_threshold: u32,
    /// Drop columns that the metadata does not describe
    pub drop_unknown_columns: bool,
    /// Columns kept even though the metadata does not describe them
    pub transaction_columns: Vec<String>,
    /// Columns dropped from both tables up front
    pub excluded_columns: Vec<String>,
    /// Per-column strings that mean "missing"; the column is cast to float after
    pub placeholder_codes: BTreeMap<String, Vec<String>>,
    /// Meanings that mark a metadata value as unknown
    pub unknown_meanings: Vec<String>,
    /// Metadata values that stand for "any value"
    pub ellipsis_markers: Vec<String>,
    pub empty_column_policy: EmptyColumnPolicy,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        let mut placeholder_codes = BTreeMap::new();
        placeholder_codes.insert(
            "CAMEO_DEUG_2015".to_owned(),
            vec!["X".to_owned(), "XX".to_owned()],
        );

        Self {
            column_null_threshold: DEFAULT_COLUMN_NULL_THRESHOLD,
            row_null_threshold: DEFAULT_ROW_NULL_THRESHOLD,
            drop_unknown_columns: true,
            transaction_columns: TRANSACTION_COLUMNS.map(str::to_owned).to_vec(),
            excluded_columns: DEFAULT_EXCLUDED_COLUMNS.map(str::to_owned).to_vec(),
            placeholder_codes,
            unknown_meanings: DEFAULT_UNKNOWN_MEANINGS.map(str::to_owned).to_vec(),
            ellipsis_markers: DEFAULT_ELLIPSIS_MARKERS.map(str::to_owned).to_vec(),
            empty_column_policy: EmptyColumnPolicy::default(),
        }
    }
}

impl CleaningConfig {
    /// Load a config from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.column_null_threshold) {
            return Err(CleanError::Config(format!(
                "column_null_threshold must be within [0, 1], got {}",
                self.column_null_threshold
            )));
        }
        if self.unknown_meanings.is_empty() {
            tracing::warn!("No unknown meanings configured, unknown codes will be kept");
        }
        Ok(())
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            unknown_meanings: self.unknown_meanings.clone(),
            ellipsis_markers: self.ellipsis_markers.clone(),
        }
    }
}
