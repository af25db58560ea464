//! Plain-text rendering for the terminal subcommands.

use std::{borrow::Cow, fmt::Write as _};

use itertools::Itertools;

use crate::{
    hierarchy::HierarchyLevel,
    presets::HierarchyAlternative,
    profile::ColumnStat,
    taxonomy::{TaxonomyNode, TaxonomyTree},
};

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .join("  ");
    line.trim_end().to_string()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

pub fn render_column_stats(stats: &[ColumnStat], levels: &[HierarchyLevel]) -> String {
    let headers = [
        "#", "column", "unique", "filled", "cardinality", "completeness", "score", "class", "level",
    ]
    .map(String::from);
    let rows = stats
        .iter()
        .map(|stat| {
            let level = levels
                .iter()
                .find(|level| level.contains(&stat.header))
                .map_or_else(|| "-".to_string(), |level| level.level.to_string());
            vec![
                (stat.index + 1).to_string(),
                stat.header.clone(),
                stat.unique_count.to_string(),
                stat.total_count.to_string(),
                format!("{:.3}", stat.cardinality),
                format!("{:.3}", stat.completeness),
                stat.hierarchy_score.to_string(),
                stat.classification.as_str().to_string(),
                level,
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn render_levels(levels: &[HierarchyLevel]) -> String {
    let headers = ["level", "name", "record id", "record name", "columns"].map(String::from);
    let rows = levels
        .iter()
        .map(|level| {
            vec![
                level.level.to_string(),
                level.name.clone(),
                level.record_id.clone(),
                level.record_name.clone().unwrap_or_else(|| "-".to_string()),
                level.headers.iter().join(", "),
            ]
        })
        .collect::<Vec<_>>();
    render_table(&headers, &rows)
}

pub fn render_presets(presets: &[HierarchyAlternative]) -> String {
    presets
        .iter()
        .map(|preset| {
            format!(
                "{} ({}, confidence {:.2})\n{}\n{}",
                preset.name,
                preset.model_type.as_str(),
                preset.confidence,
                preset.reasoning,
                render_levels(&preset.hierarchy)
            )
        })
        .join("\n")
}

pub fn render_tree(tree: &TaxonomyTree, depth: Option<usize>) -> String {
    let mut output = String::new();
    if tree.columns.is_empty() {
        output.push_str("(no repeating columns to build a tree from)\n");
        return output;
    }
    let _ = writeln!(output, "{}", tree.columns.iter().join(" > "));
    let limit = depth.unwrap_or(tree.columns.len()).max(1);
    for node in &tree.roots {
        write_node(&mut output, node, 0, limit);
    }
    if tree.skipped_rows > 0 {
        let _ = writeln!(output, "({} row(s) skipped)", tree.skipped_rows);
    }
    output
}

fn write_node(output: &mut String, node: &TaxonomyNode, indent: usize, limit: usize) {
    let _ = writeln!(output, "{}{} ({})", "  ".repeat(indent), node.value, node.count);
    if indent + 1 < limit {
        for child in &node.children {
            write_node(output, child, indent + 1, limit);
        }
    }
}
