//! Taxonomy paths and the taxonomy tree.
//!
//! Paths group rows by the Record ID values of the non-terminal levels of the
//! chosen hierarchy. The tree is built independently from the best-scoring
//! repeating columns, for renderers that want a browsable structure.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    config::AnalysisConfig, hierarchy::HierarchyLevel, profile::ColumnStat, value::Table,
};

pub const UNKNOWN_SEGMENT: &str = "Unknown";
pub const MAX_TREE_DEPTH: usize = 4;
const TREE_MIN_SCORE: u8 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyPath {
    pub path: Vec<String>,
    pub product_count: usize,
    /// Terminal-level columns holding at least one value on this path.
    pub properties: Vec<String>,
}

pub fn build_taxonomy_paths(table: &Table<'_>, levels: &[HierarchyLevel]) -> Vec<TaxonomyPath> {
    let Some((terminal, upper)) = levels.split_last() else {
        return Vec::new();
    };
    if upper.is_empty() {
        return Vec::new();
    }
    let path_columns: Vec<Option<usize>> = upper
        .iter()
        .map(|level| table.column_index(&level.record_id))
        .collect();
    let property_columns: Vec<(&str, usize)> = terminal
        .members()
        .filter_map(|header| table.column_index(header).map(|column| (header, column)))
        .collect();

    let mut groups: HashMap<Vec<String>, (usize, HashSet<usize>)> = HashMap::new();
    for row in 0..table.row_count() {
        let path: Vec<String> = path_columns
            .iter()
            .map(|column| {
                column
                    .and_then(|column| table.text(row, column))
                    .map_or_else(|| UNKNOWN_SEGMENT.to_string(), |value| value.into_owned())
            })
            .collect();
        let entry = groups.entry(path).or_default();
        entry.0 += 1;
        for (position, (_, column)) in property_columns.iter().enumerate() {
            if !table.cell(row, *column).is_empty() {
                entry.1.insert(position);
            }
        }
    }

    let mut paths: Vec<TaxonomyPath> = groups
        .into_iter()
        .map(|(path, (product_count, filled))| TaxonomyPath {
            path,
            product_count,
            properties: property_columns
                .iter()
                .enumerate()
                .filter(|(position, _)| filled.contains(position))
                .map(|(_, (header, _))| header.to_string())
                .collect(),
        })
        .collect();
    paths.sort_by(|a, b| {
        b.product_count
            .cmp(&a.product_count)
            .then_with(|| a.path.cmp(&b.path))
    });
    paths
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyNode {
    pub value: String,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaxonomyNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxonomyTree {
    /// Columns walked from the root down.
    pub columns: Vec<String>,
    pub roots: Vec<TaxonomyNode>,
    /// Rows left out because a tree column was empty or `unknown`.
    pub skipped_rows: usize,
}

#[derive(Default)]
struct NodeBuilder {
    count: usize,
    children: BTreeMap<String, NodeBuilder>,
}

impl NodeBuilder {
    fn insert(&mut self, path: &[String]) {
        self.count += 1;
        if let Some((head, rest)) = path.split_first() {
            self.children.entry(head.clone()).or_default().insert(rest);
        }
    }

    fn into_nodes(self) -> Vec<TaxonomyNode> {
        self.children
            .into_iter()
            .map(|(value, child)| TaxonomyNode {
                value,
                count: child.count,
                children: child.into_nodes(),
            })
            .collect()
    }
}

/// Up to four repeating, well-filled columns, most hierarchical first.
pub fn tree_columns(
    table: &Table<'_>,
    stats: &[ColumnStat],
    config: &AnalysisConfig,
) -> Vec<usize> {
    let mut candidates: Vec<&ColumnStat> = table
        .distinct_columns()
        .iter()
        .filter_map(|&column| stats.get(column))
        .filter(|stat| {
            stat.hierarchy_score >= TREE_MIN_SCORE && stat.cardinality < config.sku_threshold
        })
        .collect();
    candidates.sort_by(|a, b| {
        b.hierarchy_score
            .cmp(&a.hierarchy_score)
            .then_with(|| a.cardinality.total_cmp(&b.cardinality))
            .then_with(|| a.index.cmp(&b.index))
    });
    candidates
        .into_iter()
        .take(MAX_TREE_DEPTH)
        .map(|stat| stat.index)
        .collect()
}

pub fn build_taxonomy_tree(
    table: &Table<'_>,
    stats: &[ColumnStat],
    config: &AnalysisConfig,
) -> TaxonomyTree {
    let columns = tree_columns(table, stats, config);
    if columns.is_empty() {
        return TaxonomyTree::default();
    }
    let mut root = NodeBuilder::default();
    let mut skipped_rows = 0;
    'rows: for row in 0..table.row_count() {
        let mut path = Vec::with_capacity(columns.len());
        for &column in &columns {
            match table.text(row, column) {
                Some(value) if !value.eq_ignore_ascii_case("unknown") => {
                    path.push(value.into_owned())
                }
                _ => {
                    skipped_rows += 1;
                    continue 'rows;
                }
            }
        }
        root.insert(&path);
    }
    TaxonomyTree {
        columns: columns
            .iter()
            .map(|&column| table.header(column).to_string())
            .collect(),
        roots: root.into_nodes(),
        skipped_rows,
    }
}
