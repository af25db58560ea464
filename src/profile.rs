//! Column profiler.
//!
//! Computes per-column uniqueness and completeness and folds them into the
//! hierarchy score. Cardinality alone cannot tell a sparsely filled "rare but
//! unique" column from a reliably repeating category column, so the score
//! needs both.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{config::AnalysisConfig, value::Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnClass {
    /// Cardinality at or below the parent threshold.
    Parent,
    /// Cardinality inside the children band.
    Children,
    /// Cardinality at or above the SKU threshold.
    Sku,
    Attribute,
    Empty,
}

impl ColumnClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnClass::Parent => "parent",
            ColumnClass::Children => "children",
            ColumnClass::Sku => "sku",
            ColumnClass::Attribute => "attribute",
            ColumnClass::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnStat {
    pub header: String,
    /// Position of the column in the input header row.
    pub index: usize,
    pub unique_count: usize,
    pub total_count: usize,
    pub cardinality: f64,
    pub completeness: f64,
    pub hierarchy_score: u8,
    pub classification: ColumnClass,
}

impl ColumnStat {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

pub fn hierarchy_score(completeness: f64, cardinality: f64) -> u8 {
    if completeness >= 0.8 {
        if cardinality <= 0.05 {
            100
        } else if cardinality <= 0.30 {
            75
        } else if cardinality <= 0.70 {
            50
        } else {
            25
        }
    } else if completeness >= 0.5 {
        40
    } else {
        10
    }
}

pub fn classify_cardinality(total_count: usize, cardinality: f64, config: &AnalysisConfig) -> ColumnClass {
    if total_count == 0 {
        ColumnClass::Empty
    } else if cardinality >= config.sku_threshold {
        ColumnClass::Sku
    } else if cardinality <= config.parent_threshold {
        ColumnClass::Parent
    } else if cardinality >= config.children_min && cardinality <= config.children_max {
        ColumnClass::Children
    } else {
        ColumnClass::Attribute
    }
}

pub fn profile_column(table: &Table<'_>, column: usize, config: &AnalysisConfig) -> ColumnStat {
    let mut distinct = HashSet::new();
    let mut total_count = 0usize;
    for value in table.column_texts(column).flatten() {
        total_count += 1;
        distinct.insert(value);
    }
    let unique_count = distinct.len();
    let cardinality = if total_count == 0 {
        0.0
    } else {
        unique_count as f64 / total_count as f64
    };
    let completeness = if table.row_count() == 0 {
        0.0
    } else {
        total_count as f64 / table.row_count() as f64
    };
    ColumnStat {
        header: table.header(column).to_string(),
        index: column,
        unique_count,
        total_count,
        cardinality,
        completeness,
        hierarchy_score: hierarchy_score(completeness, cardinality),
        classification: classify_cardinality(total_count, cardinality, config),
    }
}

/// One [`ColumnStat`] per physical column, in header order.
pub fn profile_columns(table: &Table<'_>, config: &AnalysisConfig) -> Vec<ColumnStat> {
    (0..table.column_count())
        .map(|column| profile_column(table, column, config))
        .collect()
}
