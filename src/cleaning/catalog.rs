//! Attribute catalog built from the metadata table.
//!
//! The metadata table lists, for every attribute, the raw codes it may take
//! and what each code means. Attribute names are only written on the first
//! row of each block, so rows are forward filled before grouping:
//!
//! ```text
//! Attribute   Value   Meaning
//! AGER_TYP    -1      unknown
//!             0       no classification possible
//!             1       passive elderly
//! ```
//!
//! Two things are derived per attribute: the set of legitimate values (every
//! listed code, with composite tokens such as `"-1, 0"` split into their
//! members) and the set of codes whose meaning is "unknown".

use crate::error::{CleanError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

/// Meanings that mark a code as "value not known".
pub const DEFAULT_UNKNOWN_MEANINGS: [&str; 3] =
    ["unknown", "no transactions known", "no transaction known"];

/// Placeholder values for attributes whose codes are not enumerated.
/// The second form is the same character after a cp1252 round trip.
pub const DEFAULT_ELLIPSIS_MARKERS: [&str; 2] = ["…", "â€¦"];

const ATTRIBUTE_COLUMN: &str = "Attribute";
const VALUE_COLUMN: &str = "Value";
const MEANING_COLUMN: &str = "Meaning";

/// One raw row of the metadata table. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataRow {
    pub attribute: Option<String>,
    pub value: Option<String>,
    pub meaning: Option<String>,
}

impl MetadataRow {
    pub fn new(attribute: Option<&str>, value: Option<&str>, meaning: Option<&str>) -> Self {
        Self {
            attribute: attribute.and_then(non_blank),
            value: value.and_then(non_blank),
            meaning: meaning.and_then(non_blank),
        }
    }
}

/// A metadata row after forward fill; always belongs to an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilledRow {
    pub attribute: String,
    pub value: Option<String>,
    pub meaning: Option<String>,
}

/// Assigns every blank-attribute row to the most recent named attribute.
///
/// Rows before the first named attribute have no owner and are discarded.
pub fn forward_fill(rows: &[MetadataRow]) -> Vec<FilledRow> {
    rows.iter()
        .scan(None::<String>, |current, row| {
            if let Some(name) = &row.attribute {
                *current = Some(name.clone());
            }
            Some(current.clone().map(|attribute| FilledRow {
                attribute,
                value: row.value.clone(),
                meaning: row.meaning.clone(),
            }))
        })
        .flatten()
        .collect()
}

/// Parsed form of a raw `Value` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueToken {
    /// A single integer code or a comma separated list such as `-1, 0`
    Codes(Vec<i64>),
    /// An inclusive range written `a..b` or `a...b`
    Range(i64, i64),
    /// Any other text, e.g. `O`/`W` for east/west flags
    Label(String),
}

impl ValueToken {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(codes) = parse_code_list(trimmed) {
            return Self::Codes(codes);
        }
        if let Some((low, high)) = parse_range(trimmed) {
            return Self::Range(low, high);
        }
        Self::Label(trimmed.to_owned())
    }
}

/// Parses an integer code, accepting integral floats such as `"3.0"`.
pub fn parse_code(token: &str) -> Option<i64> {
    let token = token.trim();
    if let Ok(code) = token.parse::<i64>() {
        return Some(code);
    }
    let value = token.parse::<f64>().ok()?;
    as_code(value)
}

/// The integer code for `value`, if it has one.
pub fn as_code(value: f64) -> Option<i64> {
    (value.is_finite() && value.fract() == 0.0).then_some(value as i64)
}

fn parse_code_list(token: &str) -> Option<Vec<i64>> {
    token.split(',').map(parse_code).collect()
}

fn parse_range(token: &str) -> Option<(i64, i64)> {
    let (low, high) = token.split_once("...").or_else(|| token.split_once(".."))?;
    let (low, high) = (parse_code(low)?, parse_code(high)?);
    (low <= high).then_some((low, high))
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

/// The values an attribute may legitimately take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegitimateValues {
    pub codes: BTreeSet<i64>,
    pub ranges: Vec<RangeInclusive<i64>>,
    pub labels: BTreeSet<String>,
}

impl LegitimateValues {
    pub fn from_tokens<'a>(raw: impl IntoIterator<Item = &'a str>) -> Self {
        let mut values = Self::default();
        for token in raw {
            values.insert(ValueToken::parse(token));
        }
        values
    }

    pub fn insert(&mut self, token: ValueToken) {
        match token {
            ValueToken::Codes(codes) => self.codes.extend(codes),
            ValueToken::Range(low, high) => {
                let range = low..=high;
                if !self.ranges.contains(&range) {
                    self.ranges.push(range);
                }
            }
            ValueToken::Label(label) => {
                self.labels.insert(label);
            }
        }
    }

    /// Numeric cells match a listed code exactly or fall inside a range.
    pub fn contains_number(&self, value: f64) -> bool {
        if as_code(value).is_some_and(|code| self.codes.contains(&code)) {
            return true;
        }
        self.ranges
            .iter()
            .any(|range| value >= *range.start() as f64 && value <= *range.end() as f64)
    }

    /// Text cells match a listed label, or a listed number when numeric.
    pub fn contains_label(&self, label: &str) -> bool {
        let label = label.trim();
        self.labels.contains(label)
            || label
                .parse::<f64>()
                .is_ok_and(|value| self.contains_number(value))
    }
}

/// Everything the catalog knows about one attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeEntry {
    /// `None` when the metadata does not enumerate the attribute's values
    pub legitimate: Option<LegitimateValues>,
    pub unknown: BTreeSet<i64>,
}

/// Which metadata rows are special.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogOptions {
    pub unknown_meanings: Vec<String>,
    pub ellipsis_markers: Vec<String>,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        Self {
            unknown_meanings: DEFAULT_UNKNOWN_MEANINGS.map(str::to_owned).to_vec(),
            ellipsis_markers: DEFAULT_ELLIPSIS_MARKERS.map(str::to_owned).to_vec(),
        }
    }
}

impl CatalogOptions {
    fn is_unknown_meaning(&self, meaning: &str) -> bool {
        self.unknown_meanings.iter().any(|m| m == meaning)
    }

    fn is_ellipsis(&self, value: &str) -> bool {
        self.ellipsis_markers.iter().any(|m| m == value)
    }
}

/// Per-attribute legitimate and unknown values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeCatalog {
    entries: BTreeMap<String, AttributeEntry>,
}

impl AttributeCatalog {
    /// Builds the catalog from a metadata frame with `Attribute`, `Value`
    /// and `Meaning` columns. Any other column (the unnamed index) is ignored.
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` if a required column is missing, `MetadataParse` if
    /// an unknown-meaning value is not an integer code.
    pub fn from_frame(frame: &DataFrame, options: &CatalogOptions) -> Result<Self> {
        let attributes = text_cells(frame, ATTRIBUTE_COLUMN)?;
        let values = text_cells(frame, VALUE_COLUMN)?;
        let meanings = text_cells(frame, MEANING_COLUMN)?;

        let ignored: Vec<_> = frame
            .get_column_names()
            .into_iter()
            .filter(|name| ![ATTRIBUTE_COLUMN, VALUE_COLUMN, MEANING_COLUMN].contains(&name.as_str()))
            .collect();
        if !ignored.is_empty() {
            tracing::debug!("Ignoring metadata columns {ignored:?}");
        }

        let rows: Vec<MetadataRow> = attributes
            .into_iter()
            .zip(values)
            .zip(meanings)
            .map(|((attribute, value), meaning)| MetadataRow {
                attribute,
                value,
                meaning,
            })
            .collect();

        Self::from_rows(&rows, options)
    }

    /// Builds the catalog from raw metadata rows.
    ///
    /// # Errors
    ///
    /// `MetadataParse` if an unknown-meaning value is not an integer code.
    pub fn from_rows(rows: &[MetadataRow], options: &CatalogOptions) -> Result<Self> {
        let filled = forward_fill(rows);

        // An ellipsis means "any value"; such attributes get no value set.
        let open_ended: BTreeSet<&str> = filled
            .iter()
            .filter(|row| row.value.as_deref().is_some_and(|v| options.is_ellipsis(v)))
            .map(|row| row.attribute.as_str())
            .collect();

        let mut grouped: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        let mut unknown_tokens: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for row in &filled {
            let values = grouped.entry(row.attribute.as_str()).or_default();
            if let Some(value) = &row.value {
                values.insert(value.as_str());
            }
            if row
                .meaning
                .as_deref()
                .is_some_and(|m| options.is_unknown_meaning(m))
            {
                unknown_tokens
                    .entry(row.attribute.as_str())
                    .or_default()
                    .push(row.value.as_deref().unwrap_or_default());
            }
        }

        let mut entries = BTreeMap::new();
        for (attribute, values) in grouped {
            let legitimate = if open_ended.contains(attribute) {
                tracing::debug!("Attribute {attribute} has open-ended values, skipping value set");
                None
            } else if values.is_empty() {
                None
            } else {
                Some(LegitimateValues::from_tokens(values))
            };
            let unknown = match unknown_tokens.get(attribute) {
                Some(tokens) => parse_unknown_codes(attribute, tokens)?,
                None => BTreeSet::new(),
            };
            entries.insert(attribute.to_owned(), AttributeEntry { legitimate, unknown });
        }

        let catalog = Self { entries };
        tracing::info!(
            "Attribute catalog: {} attributes, {} with value sets, {} with unknown codes",
            catalog.len(),
            catalog
                .entries
                .values()
                .filter(|e| e.legitimate.is_some())
                .count(),
            catalog
                .entries
                .values()
                .filter(|e| !e.unknown.is_empty())
                .count()
        );
        Ok(catalog)
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeEntry> {
        self.entries.get(attribute)
    }

    pub fn contains(&self, attribute: &str) -> bool {
        self.entries.contains_key(attribute)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Joins the unknown-meaning values of one attribute and re-splits them
/// into integer codes, so `"-1, 9"` and `"0"` give `{-1, 0, 9}`.
fn parse_unknown_codes(attribute: &str, tokens: &[&str]) -> Result<BTreeSet<i64>> {
    tokens
        .join(",")
        .split(',')
        .map(|token| {
            parse_code(token).ok_or_else(|| CleanError::MetadataParse {
                attribute: attribute.to_owned(),
                token: token.trim().to_owned(),
            })
        })
        .collect()
}

/// Reads a metadata column as optional text. Numeric cells are rendered as
/// integer codes where possible (`3.0` reads as `"3"`).
fn text_cells(frame: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = frame.column(name).map_err(|e| {
        CleanError::SchemaMismatch(format!("metadata table has no '{name}' column ({e})"))
    })?;
    let series = column.as_materialized_series();

    if series.dtype().is_primitive_numeric() {
        let casted = series.cast(&DataType::Float64)?;
        let cells = casted
            .f64()?
            .into_iter()
            .map(|cell| cell.map(render_number))
            .collect();
        return Ok(cells);
    }

    let casted = series.cast(&DataType::String)?;
    let cells = casted
        .str()?
        .into_iter()
        .map(|cell| cell.and_then(non_blank))
        .collect();
    Ok(cells)
}

fn render_number(value: f64) -> String {
    as_code(value).map_or_else(|| value.to_string(), |code| code.to_string())
}
