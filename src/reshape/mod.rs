// src/reshape/mod.rs

//! Wide-to-long reshaping.
//!
//! A wide table carries a few identity columns followed by one column per
//! year. Each row becomes a [`Record`]: the identity cells (accent-stripped)
//! plus an ordered list of `(year, value)` pairs. Year columns are kept in
//! file order, never sorted. Columns after the identity prefix whose header
//! is not a year are dropped with a warning; they never fail the reshape.

use serde::{ser::SerializeMap, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    normalize::{normalize_cell, normalize_header},
    process::{CellValue, RawTable},
};

/// JSON key holding the series in a serialized [`Record`].
pub const SERIES_KEY: &str = "dados";

/// One point of a record's series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearValue {
    #[serde(rename = "ano")]
    pub year: i32,
    #[serde(rename = "valor")]
    pub value: CellValue,
}

/// One input row in long form.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Identity columns in header order.
    pub fixed: Vec<(String, CellValue)>,
    pub series: Vec<YearValue>,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.fixed.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.series.iter().map(|p| p.year)
    }
}

/// Fixed keys first, in order, then the series under [`SERIES_KEY`].
impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fixed.len() + 1))?;
        for (key, value) in &self.fixed {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry(SERIES_KEY, &self.series)?;
        map.end()
    }
}

/// Non-fatal reshape finding; logged, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReshapeWarning {
    #[error("column '{column}' is not a year; left out of the series")]
    UnparsableYear { column: String },
}

/// Parse a header as a year: an integer, or a float with no fractional part
/// ("1970.0"), surrounding whitespace ignored.
pub fn parse_year(header: &str) -> Option<i32> {
    let trimmed = header.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    let f = trimmed.parse::<f64>().ok()?;
    if f.is_finite() && f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}

/// Make identity names unique: a repeat of `name` becomes `name.1`,
/// `name.2`, ... skipping any name already taken. [`SERIES_KEY`] counts as
/// taken so an identity column never shadows the series.
fn dedup_names(names: Vec<String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::from([SERIES_KEY.to_string()]);
    let mut repeats: HashMap<String, usize> = HashMap::new();
    names
        .into_iter()
        .map(|name| {
            if taken.insert(name.clone()) {
                return name;
            }
            let n = repeats.entry(name.clone()).or_insert(0);
            loop {
                *n += 1;
                let candidate = format!("{name}.{n}");
                if taken.insert(candidate.clone()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// How the columns of one table split into identity and series columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesLayout {
    /// Normalized, unique names of the identity columns.
    pub fixed: Vec<String>,
    /// `(column index, year)` for every usable series column, in file order.
    pub series: Vec<(usize, i32)>,
}

impl SeriesLayout {
    /// Split `headers` after the first `fixed_columns` (clamped to the
    /// header count) and parse the rest as years.
    pub fn plan(headers: &[String], fixed_columns: usize) -> (Self, Vec<ReshapeWarning>) {
        let split = fixed_columns.min(headers.len());
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

        let fixed = dedup_names(normalized[..split].to_vec());
        let mut series = Vec::with_capacity(normalized.len() - split);
        let mut warnings = Vec::new();

        for (idx, header) in normalized.iter().enumerate().skip(split) {
            match parse_year(header) {
                Some(year) => series.push((idx, year)),
                None => warnings.push(ReshapeWarning::UnparsableYear {
                    column: header.clone(),
                }),
            }
        }

        (Self { fixed, series }, warnings)
    }

    fn record(&self, row: &[CellValue]) -> Record {
        let fixed = self
            .fixed
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let cell = row.get(idx).cloned().unwrap_or(CellValue::Empty);
                (key.clone(), normalize_cell(cell))
            })
            .collect();

        let series = self
            .series
            .iter()
            .map(|&(idx, year)| YearValue {
                year,
                value: row
                    .get(idx)
                    .cloned()
                    .unwrap_or(CellValue::Empty)
                    .classify(),
            })
            .collect();

        Record { fixed, series }
    }
}

/// Lazily reshape `table`, one record per row in row order.
/// Warnings about dropped columns are logged up front.
pub fn records(table: &RawTable, fixed_columns: usize) -> impl Iterator<Item = Record> + '_ {
    let (layout, warnings) = SeriesLayout::plan(table.headers(), fixed_columns);
    for warning in &warnings {
        warn!(%warning, "reshape");
    }
    debug!(
        fixed = layout.fixed.len(),
        years = layout.series.len(),
        dropped = warnings.len(),
        rows = table.height(),
        "reshaping"
    );
    table.rows().iter().map(move |row| layout.record(row))
}

pub fn reshape(table: &RawTable, fixed_columns: usize) -> Vec<Record> {
    records(table, fixed_columns).collect()
}
