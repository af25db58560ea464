//! Rows with missing hierarchy values, short paths or numeric outliers.

use serde::{Deserialize, Serialize};

use crate::{hierarchy::HierarchyLevel, value::Table};

pub const MAX_ORPHANED_RECORDS: usize = 50;
const OUTLIER_SIGMAS: f64 = 3.0;
const NUMERIC_COLUMN_RATIO: f64 = 0.9;
const MIN_NUMERIC_VALUES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedRecord {
    pub row_index: usize,
    pub issues: Vec<String>,
    pub severity: Severity,
}

#[derive(Debug)]
struct NumericColumn<'h> {
    header: &'h str,
    column: usize,
    mean: f64,
    std_dev: f64,
}

fn numeric_columns<'h>(table: &Table<'h>) -> Vec<NumericColumn<'h>> {
    let mut numeric = Vec::new();
    for &column in table.distinct_columns() {
        let mut non_empty = 0usize;
        let mut values = Vec::new();
        for row in 0..table.row_count() {
            let cell = table.cell(row, column);
            if cell.is_empty() {
                continue;
            }
            non_empty += 1;
            if let Some(value) = cell.as_number() {
                values.push(value);
            }
        }
        if values.len() < MIN_NUMERIC_VALUES
            || (values.len() as f64) / (non_empty as f64) <= NUMERIC_COLUMN_RATIO
        {
            continue;
        }
        let count = values.len() as f64;
        let mean = values.iter().sum::<f64>() / count;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
        numeric.push(NumericColumn {
            header: table.header(column),
            column,
            mean,
            std_dev: variance.sqrt(),
        });
    }
    numeric
}

pub fn detect_orphans(table: &Table<'_>, levels: &[HierarchyLevel]) -> Vec<OrphanedRecord> {
    let Some((_, upper)) = levels.split_last() else {
        return Vec::new();
    };
    let hierarchy_fields: Vec<(&str, usize)> = upper
        .iter()
        .flat_map(|level| level.members())
        .filter_map(|header| table.column_index(header).map(|column| (header, column)))
        .collect();
    let path_columns: Vec<usize> = levels
        .iter()
        .filter_map(|level| table.column_index(&level.record_id))
        .collect();
    let numeric = numeric_columns(table);

    let mut orphans = Vec::new();
    for row in 0..table.row_count() {
        if orphans.len() >= MAX_ORPHANED_RECORDS {
            break;
        }
        let mut issues = Vec::new();
        let mut severity: Option<Severity> = None;

        for (header, column) in &hierarchy_fields {
            if table.cell(row, *column).is_empty() {
                issues.push(format!("missing value for hierarchy field '{header}'"));
                severity = Some(Severity::High);
            }
        }

        let present = path_columns
            .iter()
            .filter(|&&column| !table.cell(row, column).is_empty())
            .count();
        if present < path_columns.len() {
            issues.push(format!(
                "incomplete hierarchy path ({present} of {} levels)",
                path_columns.len()
            ));
            severity = severity.max(Some(Severity::Medium));
        }

        for column in &numeric {
            let Some(value) = table.cell(row, column.column).as_number() else {
                continue;
            };
            if column.std_dev > 0.0 {
                let sigmas = (value - column.mean).abs() / column.std_dev;
                if sigmas > OUTLIER_SIGMAS {
                    issues.push(format!(
                        "outlier in '{}': {value} is {sigmas:.1} standard deviations from the mean",
                        column.header
                    ));
                }
            }
        }

        if !issues.is_empty() {
            orphans.push(OrphanedRecord {
                row_index: row,
                issues,
                severity: severity.unwrap_or(Severity::Low),
            });
        }
    }
    orphans
}
