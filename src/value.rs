//! Input cells and the validated tabular view every stage reads from.
//!
//! The ingestion collaborator hands the engine a header row plus rows of
//! [`Cell`]s aligned to it by index. [`Table`] checks that alignment once and
//! then exposes trimmed textual access so no stage has to care whether a value
//! arrived as a number or a string.

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    fmt,
};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Trimmed textual form, or `None` when the cell is empty.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match self {
            Cell::Null => None,
            Cell::Number(value) if !value.is_finite() => None,
            Cell::Number(value) => Some(Cow::Owned(format_number(*value))),
            Cell::Text(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(trimmed))
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text().is_none()
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) if value.is_finite() => Some(*value),
            Cell::Number(_) | Cell::Null => None,
            Cell::Text(raw) => parse_number(raw),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text() {
            Some(text) => write!(f, "{text}"),
            None => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            Cell::Null
        } else {
            Cell::Text(value.to_string())
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        if value.trim().is_empty() {
            Cell::Null
        } else {
            Cell::Text(value)
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value as f64)
    }
}

impl<T> From<Option<T>> for Cell
where
    T: Into<Cell>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Parses a numeric token, accepting a comma as decimal separator when no dot
/// is present. Rejects `inf`/`nan` spellings that `f64::from_str` would take.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let first = trimmed.chars().next()?;
    if !(first.is_ascii_digit() || matches!(first, '-' | '+' | '.')) {
        return None;
    }
    let parsed = trimmed.parse::<f64>().ok().or_else(|| {
        if trimmed.contains(',') && !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
            trimmed.replace(',', ".").parse::<f64>().ok()
        } else {
            None
        }
    })?;
    parsed.is_finite().then_some(parsed)
}

pub fn parse_naive_date(value: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y", "%Y%m%d",
    ];
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}

pub fn parse_naive_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

pub fn looks_like_date(value: &str) -> bool {
    let trimmed = value.trim();
    parse_naive_date(trimmed).is_some() || parse_naive_datetime(trimmed).is_some()
}

/// Row-aligned, validated view over the caller's headers and rows.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    headers: &'a [String],
    rows: &'a [Vec<Cell>],
    distinct: Vec<usize>,
}

impl<'a> Table<'a> {
    pub fn new(headers: &'a [String], rows: &'a [Vec<Cell>]) -> AnalysisOutcome<Self> {
        if headers.is_empty() {
            return Err(AnalysisError::NoColumns);
        }
        if let Some((row, cells)) = rows
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != headers.len())
        {
            return Err(AnalysisError::RowLengthMismatch {
                row,
                expected: headers.len(),
                found: cells.len(),
            });
        }
        let mut seen = HashSet::new();
        let distinct = headers
            .iter()
            .enumerate()
            .filter(|(_, header)| seen.insert(header.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        Ok(Self {
            headers,
            rows,
            distinct,
        })
    }

    pub fn headers(&self) -> &'a [String] {
        self.headers
    }

    pub fn header(&self, column: usize) -> &'a str {
        &self.headers[column]
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Column indexes of the first occurrence of every distinct header.
    pub fn distinct_columns(&self) -> &[usize] {
        &self.distinct
    }

    pub fn distinct_headers(&self) -> Vec<&'a str> {
        self.distinct
            .iter()
            .map(|&idx| self.headers[idx].as_str())
            .collect()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Every physical column carrying `header`, duplicates included.
    pub fn columns_named<'h>(&self, header: &'h str) -> impl Iterator<Item = usize> {
        self.headers
            .iter()
            .enumerate()
            .filter(move |(_, h)| h.as_str() == header)
            .map(|(idx, _)| idx)
    }

    pub fn cell(&self, row: usize, column: usize) -> &'a Cell {
        &self.rows[row][column]
    }

    pub fn text(&self, row: usize, column: usize) -> Option<Cow<'a, str>> {
        self.rows[row][column].text()
    }

    pub fn column_texts(&self, column: usize) -> impl Iterator<Item = Option<Cow<'a, str>>> + '_ {
        self.rows.iter().map(move |row| row[column].text())
    }

    pub fn non_empty_values(&self, column: usize) -> Vec<Cow<'a, str>> {
        self.column_texts(column).flatten().collect()
    }

    /// Number of distinct non-empty value tuples across `columns`; rows that
    /// are empty in all of them are ignored.
    pub fn distinct_tuples(&self, columns: &[usize]) -> usize {
        let mut seen: HashSet<Vec<Option<Cow<'a, str>>>> = HashSet::new();
        for row in 0..self.rows.len() {
            let tuple: Vec<Option<Cow<'a, str>>> =
                columns.iter().map(|&col| self.text(row, col)).collect();
            if tuple.iter().any(Option::is_some) {
                seen.insert(tuple);
            }
        }
        seen.len()
    }

    /// Frequency of each non-empty value in a column.
    pub fn value_counts(&self, column: usize) -> HashMap<Cow<'a, str>, usize> {
        let mut counts = HashMap::new();
        for value in self.column_texts(column).flatten() {
            *counts.entry(value).or_insert(0) += 1;
        }
        counts
    }
}
