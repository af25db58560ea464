//! Pipeline orchestration and the aggregated [`AnalysisResult`].
//!
//! [`analyze`] is a pure function of headers, rows and configuration. Every
//! call builds a fresh result; nothing is cached between calls.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::AnalysisConfig,
    diagnostics::{Stage, Trace},
    domain::{ProductDomain, classify_domain},
    error::AnalysisOutcome,
    hierarchy::{self, BuildContext, HierarchyLevel},
    keywords::Lexicon,
    levels::classify_levels,
    orphans::{OrphanedRecord, detect_orphans},
    presets::{HierarchyAlternative, generate_presets},
    profile::{ColumnStat, profile_columns},
    property::{PropertyRecommendation, infer_properties},
    taxonomy::{TaxonomyPath, TaxonomyTree, build_taxonomy_paths, build_taxonomy_tree},
    uom::{UomSuggestion, detect_uom},
    value::{Cell, Table},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub row_count: usize,
    pub column_count: usize,
    pub column_stats: Vec<ColumnStat>,
    pub hierarchy: Vec<HierarchyLevel>,
    /// Attribute columns of the terminal level (Record ID and Name excluded).
    pub sku_properties: Vec<String>,
    pub confidence: f64,
    pub domain: ProductDomain,
    pub uom_suggestions: Vec<UomSuggestion>,
    pub property_recommendations: Vec<PropertyRecommendation>,
    pub orphaned_records: Vec<OrphanedRecord>,
    pub taxonomy_paths: Vec<TaxonomyPath>,
    pub taxonomy_tree: TaxonomyTree,
    pub presets: Vec<HierarchyAlternative>,
    pub config: AnalysisConfig,
    /// Short human-readable notes on how the hierarchy was chosen.
    pub reasoning: Vec<String>,
}

impl AnalysisResult {
    pub fn terminal_level(&self) -> Option<&HierarchyLevel> {
        self.hierarchy.last()
    }

    /// The level that owns `header`, whether as header, Record ID or Name.
    pub fn level_of(&self, header: &str) -> Option<&HierarchyLevel> {
        self.hierarchy.iter().find(|level| level.contains(header))
    }

    pub fn stat(&self, header: &str) -> Option<&ColumnStat> {
        self.column_stats.iter().find(|stat| stat.header == header)
    }
}

pub fn analyze(
    headers: &[String],
    rows: &[Vec<Cell>],
    config: &AnalysisConfig,
) -> AnalysisOutcome<AnalysisResult> {
    analyze_with_trace(headers, rows, config).map(|(result, _)| result)
}

/// Runs the full pipeline and also returns the decisions each stage recorded.
pub fn analyze_with_trace(
    headers: &[String],
    rows: &[Vec<Cell>],
    config: &AnalysisConfig,
) -> AnalysisOutcome<(AnalysisResult, Trace)> {
    config.validate()?;
    let table = Table::new(headers, rows)?;
    let lexicon = Lexicon::standard();
    let mut trace = Trace::new();

    let stats = profile_columns(&table, config);
    trace.record_with(
        Stage::Profile,
        format!(
            "profiled {} column(s) over {} row(s)",
            table.column_count(),
            table.row_count()
        ),
        json!({
            "scores": stats
                .iter()
                .map(|stat| json!({ "header": stat.header, "score": stat.hierarchy_score }))
                .collect::<Vec<_>>()
        }),
    );

    let domain = classify_domain(&table, lexicon);
    trace.record_with(
        Stage::Domain,
        format!("domain {} ({:.2})", domain.kind, domain.confidence),
        json!({ "indicators": domain.indicators }),
    );

    let buckets = classify_levels(&table, &stats, &domain, lexicon);
    trace.record_with(
        Stage::Levels,
        format!(
            "{} level-1, {} level-2 and {} sku candidate(s)",
            buckets.level1.len(),
            buckets.level2.len(),
            buckets.sku.len()
        ),
        json!({
            "level1": buckets.level1,
            "level2": buckets.level2,
            "sku": buckets.sku,
        }),
    );

    let ctx = BuildContext::new(&table, &stats, config, lexicon);
    let assembly = hierarchy::build_hierarchy(&ctx, &buckets, &mut trace);
    let confidence = hierarchy::confidence(&ctx, &assembly);

    let property_recommendations = infer_properties(&table, lexicon);
    trace.record(
        Stage::Properties,
        format!("{} property type(s) inferred", property_recommendations.len()),
    );

    let uom_suggestions = detect_uom(&table, lexicon);
    trace.record(
        Stage::Uom,
        format!("{} unit-of-measure suggestion(s)", uom_suggestions.len()),
    );

    let orphaned_records = detect_orphans(&table, &assembly.levels);
    trace.record(
        Stage::Orphans,
        format!("{} orphaned record(s) flagged", orphaned_records.len()),
    );

    let taxonomy_paths = build_taxonomy_paths(&table, &assembly.levels);
    let taxonomy_tree = build_taxonomy_tree(&table, &stats, config);
    trace.record_with(
        Stage::Taxonomy,
        format!(
            "{} taxonomy path(s), tree over {} column(s)",
            taxonomy_paths.len(),
            taxonomy_tree.columns.len()
        ),
        json!({ "treeColumns": taxonomy_tree.columns, "skippedRows": taxonomy_tree.skipped_rows }),
    );

    let presets = generate_presets(&ctx, &domain, &assembly.levels, confidence, &mut trace);

    let reasoning = explain(&assembly, &domain, &ctx);
    let sku_properties = assembly
        .levels
        .last()
        .map(|level| level.headers.clone())
        .unwrap_or_default();

    let result = AnalysisResult {
        row_count: table.row_count(),
        column_count: table.column_count(),
        column_stats: stats,
        hierarchy: assembly.levels,
        sku_properties,
        confidence,
        domain,
        uom_suggestions,
        property_recommendations,
        orphaned_records,
        taxonomy_paths,
        taxonomy_tree,
        presets,
        config: config.clone(),
        reasoning,
    };
    Ok((result, trace))
}

fn explain(
    assembly: &hierarchy::Assembly,
    domain: &ProductDomain,
    ctx: &BuildContext<'_, '_>,
) -> Vec<String> {
    let mut notes = Vec::new();
    match assembly.levels.len() {
        0 | 1 => notes.push(
            "no column repeats reliably enough to form a parent level; all columns stay on one record"
                .to_string(),
        ),
        count => notes.push(format!(
            "{} parent level(s) above the SKU level",
            count - 1
        )),
    }
    for level in &assembly.levels {
        let name = match &level.record_name {
            Some(name) => format!("named by {name}"),
            None => "without a suitable name column".to_string(),
        };
        notes.push(format!(
            "{}: identified by {}, {name}, {} member(s)",
            level.name,
            level.record_id,
            level.member_count()
        ));
    }
    if ctx.floor < ctx.config.min_properties_per_level {
        notes.push(format!(
            "level floor lowered to {} for a {}-column table",
            ctx.floor,
            ctx.table.distinct_columns().len()
        ));
    }
    notes.push(format!(
        "product domain {} with confidence {:.2}",
        domain.kind, domain.confidence
    ));
    if assembly.conservation.healed() {
        notes.push("some columns were restored to the SKU level after assembly".to_string());
    }
    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AnalysisError, hierarchy::TERMINAL_LEVEL_NAME};

    fn scenario_b() -> (Vec<String>, Vec<Vec<Cell>>) {
        let headers = ["Category", "SKU", "Name", "Color"]
            .map(String::from)
            .to_vec();
        let categories = ["Shoes", "Bags", "Hats", "Belts", "Socks"];
        let colors = ["red", "blue", "green", "black"];
        let rows = (0..100)
            .map(|i| {
                vec![
                    Cell::from(categories[i % 5]),
                    Cell::from(format!("SKU-{i:04}")),
                    Cell::from(format!("Item {i}")),
                    Cell::from(colors[i % 4]),
                ]
            })
            .collect();
        (headers, rows)
    }

    #[test]
    fn two_level_catalogue_is_fully_wired() {
        let (headers, rows) = scenario_b();
        let (result, trace) =
            analyze_with_trace(&headers, &rows, &AnalysisConfig::default()).expect("analysis");
        assert_eq!(result.row_count, 100);
        assert_eq!(result.column_count, 4);
        assert_eq!(result.hierarchy.len(), 2);
        let terminal = result.terminal_level().expect("terminal level");
        assert_eq!(terminal.name, TERMINAL_LEVEL_NAME);
        assert_eq!(result.sku_properties, terminal.headers);
        assert_eq!(
            result.level_of("Color").map(|level| level.level),
            Some(2)
        );
        assert_eq!(result.taxonomy_paths.len(), 5);
        assert_eq!(result.presets[0].name, "Recommended");
        assert!(result.confidence > 0.6);
        for stage in [Stage::Profile, Stage::Domain, Stage::Levels, Stage::Presets] {
            assert!(trace.for_stage(stage).count() >= 1, "missing {stage}");
        }
    }

    #[test]
    fn mismatched_row_is_rejected_with_its_index() {
        let headers = vec!["A".to_string(), "B".to_string()];
        let rows = vec![
            vec![Cell::from("x"), Cell::from("y")],
            vec![Cell::from("z")],
        ];
        assert_eq!(
            analyze(&headers, &rows, &AnalysisConfig::default()),
            Err(AnalysisError::RowLengthMismatch {
                row: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_profiling() {
        let (headers, rows) = scenario_b();
        let config = AnalysisConfig::default().with_parent_threshold(-0.1);
        assert!(matches!(
            analyze(&headers, &rows, &config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_table_still_yields_a_single_level() {
        let headers = vec!["SKU".to_string(), "Name".to_string()];
        let result = analyze(&headers, &[], &AnalysisConfig::default()).expect("analysis");
        assert_eq!(result.hierarchy.len(), 1);
        assert_eq!(result.hierarchy[0].record_id, "SKU");
        assert!(result.orphaned_records.is_empty());
        assert!(result.confidence <= 0.6);
    }

    #[test]
    fn result_serializes_with_camel_case_keys() {
        let (headers, rows) = scenario_b();
        let result = analyze(&headers, &rows, &AnalysisConfig::default()).expect("analysis");
        let value = serde_json::to_value(&result).expect("serialize");
        assert!(value.get("columnStats").is_some());
        assert!(value.get("skuProperties").is_some());
        assert_eq!(value["hierarchy"][0]["recordId"], "Category");
        assert_eq!(value["config"]["skuThreshold"], 0.98);
    }
}
