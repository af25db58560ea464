//! Ready-made alternative hierarchies.
//!
//! Each preset describes its level split as labelled drafts and goes through
//! [`hierarchy::assemble`], so presets get the same identity selection and
//! conservation guarantees as the primary hierarchy. Presets are explicit
//! user choices, so they are assembled without the level floor.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    diagnostics::{Stage, Trace},
    domain::ProductDomain,
    hierarchy::{self, BuildContext, HierarchyLevel, LevelDraft},
    keywords::HeaderKey,
    levels::{CandidateLevel, candidate_level},
    profile::ColumnStat,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Standalone,
    Flat,
    ParentVariant,
    MultiLevel,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Standalone => "standalone",
            ModelType::Flat => "flat",
            ModelType::ParentVariant => "parent_variant",
            ModelType::MultiLevel => "multi_level",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyAlternative {
    pub name: String,
    pub hierarchy: Vec<HierarchyLevel>,
    pub confidence: f64,
    pub reasoning: String,
    pub model_type: ModelType,
}

const MULTI_LEVEL_MIN_FAMILY: usize = 3;
const MULTI_LEVEL_MIN_MODEL: usize = 1;

/// Columns by level caliber: (Level-1, Level-2, everything else).
fn calibers(ctx: &BuildContext<'_, '_>, domain: &ProductDomain) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut family = Vec::new();
    let mut model = Vec::new();
    let mut rest = Vec::new();
    for &column in ctx.table.distinct_columns() {
        let header = ctx.table.header(column).to_string();
        let Some(stat) = ctx.stats.get(column) else {
            rest.push(header);
            continue;
        };
        let bucket = if ctx.terminal_reason(&header).is_some() {
            CandidateLevel::Sku
        } else {
            candidate_level(stat, domain, ctx.lexicon)
        };
        match bucket {
            CandidateLevel::Level1 => family.push(header),
            CandidateLevel::Level2 => model.push(header),
            CandidateLevel::Sku => rest.push(header),
        }
    }
    (family, model, rest)
}

/// Parent column for a Parent-Variant split when nothing repeats like a
/// level: the best-scoring column that is neither forced to the SKU level nor
/// named like an identifier. Needs at least one other column for the variant.
fn fallback_parent(ctx: &BuildContext<'_, '_>) -> Option<String> {
    if ctx.table.distinct_columns().len() < 2 {
        return None;
    }
    let id_like = |stat: &ColumnStat| ctx.lexicon.id_keywords.matches(&HeaderKey::new(&stat.header));
    ctx.table
        .distinct_columns()
        .iter()
        .filter_map(|&column| ctx.stats.get(column))
        .filter(|stat| !ctx.config.is_forced_sku(&stat.header))
        .min_by(|a, b| {
            id_like(a)
                .cmp(&id_like(b))
                .then(b.hierarchy_score.cmp(&a.hierarchy_score))
                .then(a.cardinality.total_cmp(&b.cardinality))
                .then(a.index.cmp(&b.index))
        })
        .map(|stat| stat.header.clone())
}

fn alternative(
    ctx: &BuildContext<'_, '_>,
    name: &str,
    drafts: Vec<LevelDraft>,
    model_type: ModelType,
    reasoning: String,
    trace: &mut Trace,
) -> HierarchyAlternative {
    let assembly = hierarchy::assemble(ctx, &drafts, trace);
    let confidence = hierarchy::confidence(ctx, &assembly);
    HierarchyAlternative {
        name: name.to_string(),
        hierarchy: assembly.levels,
        confidence,
        reasoning,
        model_type,
    }
}

pub fn recommended_model_type(levels: &[HierarchyLevel]) -> ModelType {
    match levels.len() {
        0 | 1 => ModelType::Standalone,
        2 => ModelType::ParentVariant,
        _ => ModelType::MultiLevel,
    }
}

pub fn generate_presets(
    ctx: &BuildContext<'_, '_>,
    domain: &ProductDomain,
    primary: &[HierarchyLevel],
    primary_confidence: f64,
    trace: &mut Trace,
) -> Vec<HierarchyAlternative> {
    let ctx = BuildContext { floor: 1, ..*ctx };
    let all_columns: Vec<String> = ctx
        .table
        .distinct_headers()
        .into_iter()
        .map(str::to_string)
        .collect();
    let mut presets = vec![HierarchyAlternative {
        name: "Recommended".to_string(),
        hierarchy: primary.to_vec(),
        confidence: primary_confidence,
        reasoning: format!("inferred hierarchy with {} level(s)", primary.len()),
        model_type: recommended_model_type(primary),
    }];

    presets.push(alternative(
        &ctx,
        "Flat",
        vec![LevelDraft::labelled(all_columns.clone(), "Product")],
        ModelType::Flat,
        "every column on a single product record".to_string(),
        trace,
    ));

    let (family, model, rest) = calibers(&ctx, domain);

    let (mut parent, mut variant, mut source) = match primary.split_last() {
        Some((terminal, upper)) if !upper.is_empty() => (
            upper
                .iter()
                .flat_map(|level| level.members().map(str::to_string))
                .collect::<Vec<_>>(),
            terminal.members().map(str::to_string).collect::<Vec<_>>(),
            "upper levels of the inferred hierarchy collapsed into one parent",
        ),
        _ => (
            family.iter().chain(&model).cloned().collect(),
            rest.clone(),
            "repeating columns grouped on a parent over per-item variants",
        ),
    };
    let fallback = if parent.is_empty() || variant.is_empty() {
        fallback_parent(&ctx)
    } else {
        None
    };
    if let Some(column) = fallback {
        variant = all_columns.iter().filter(|h| **h != column).cloned().collect();
        parent = vec![column];
        source = "most repeating non-identifier column split off as the parent";
    }
    if !parent.is_empty() && !variant.is_empty() {
        presets.push(alternative(
            &ctx,
            "Parent-Variant",
            vec![
                LevelDraft::labelled(parent, "Parent"),
                LevelDraft::labelled(variant, "Variant"),
            ],
            ModelType::ParentVariant,
            source.to_string(),
            trace,
        ));
    }

    if family.len() >= MULTI_LEVEL_MIN_FAMILY && model.len() >= MULTI_LEVEL_MIN_MODEL && !rest.is_empty() {
        let reasoning = format!(
            "{} family-level and {} model-level column(s) support three levels",
            family.len(),
            model.len()
        );
        presets.push(alternative(
            &ctx,
            "Multi-Level",
            vec![
                LevelDraft::labelled(family, "Family"),
                LevelDraft::labelled(model, "Model"),
                LevelDraft::labelled(rest, "Variant"),
            ],
            ModelType::MultiLevel,
            reasoning,
            trace,
        ));
    }

    trace.record_with(
        Stage::Presets,
        format!("{} preset(s) generated", presets.len()),
        json!({ "names": presets.iter().map(|p| p.name.clone()).collect::<Vec<_>>() }),
    );
    presets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AnalysisConfig, keywords::Lexicon, profile::profile_columns, value::{Cell, Table},
    };

    fn catalogue() -> (Vec<String>, Vec<Vec<Cell>>) {
        let headers = ["Division", "Brand", "Season", "Line", "SKU", "Name"]
            .map(String::from)
            .to_vec();
        let rows = (0..60)
            .map(|i| {
                vec![
                    Cell::from(["North", "South"][i % 2]),
                    Cell::from(["Acme", "Zenith", "Orbit"][i % 3]),
                    Cell::from(["SS24", "FW24"][i / 30]),
                    Cell::from(format!("Line {}", i % 20)),
                    Cell::from(format!("SKU-{i:03}")),
                    Cell::from(format!("Product {i}")),
                ]
            })
            .collect();
        (headers, rows)
    }

    #[test]
    fn presets_cover_flat_parent_variant_and_multi_level() {
        let (headers, rows) = catalogue();
        let table = Table::new(&headers, &rows).expect("table");
        let config = AnalysisConfig::default();
        let stats = profile_columns(&table, &config);
        let ctx = BuildContext::new(&table, &stats, &config, Lexicon::standard());
        let mut trace = Trace::new();
        let presets = generate_presets(&ctx, &ProductDomain::general(), &[], 0.3, &mut trace);
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Recommended", "Flat", "Parent-Variant", "Multi-Level"]);

        let flat = &presets[1];
        assert_eq!(flat.hierarchy.len(), 1);
        assert_eq!(flat.hierarchy[0].name, "Product");
        assert_eq!(flat.hierarchy[0].member_count(), headers.len());

        let multi = &presets[3];
        assert_eq!(multi.model_type, ModelType::MultiLevel);
        let level_names: Vec<&str> = multi.hierarchy.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(level_names, vec!["Family", "Model", "Variant"]);
        assert!(multi.hierarchy[1].contains("Line"));
        assert_eq!(multi.hierarchy[2].record_id, "SKU");
        assert_eq!(trace.for_stage(Stage::Presets).count(), 1);
    }

    #[test]
    fn parent_variant_falls_back_to_best_non_identifier_column() {
        let headers = ["ProductID", "Color", "Weight"].map(String::from).to_vec();
        let rows: Vec<Vec<Cell>> = (0..5)
            .map(|i| {
                vec![
                    Cell::from(format!("P-00{i}")),
                    Cell::from(["red", "blue", "green", "black", "white"][i]),
                    Cell::from(format!("{i}.5")),
                ]
            })
            .collect();
        let table = Table::new(&headers, &rows).expect("table");
        let config = AnalysisConfig::default();
        let stats = profile_columns(&table, &config);
        let ctx = BuildContext::new(&table, &stats, &config, Lexicon::standard());
        let mut trace = Trace::new();
        let presets = generate_presets(&ctx, &ProductDomain::general(), &[], 0.3, &mut trace);
        assert!(presets.len() >= 3);
        let split = presets
            .iter()
            .find(|preset| preset.model_type == ModelType::ParentVariant)
            .expect("parent-variant preset");
        assert_eq!(split.hierarchy.len(), 2);
        assert_eq!(split.hierarchy[0].record_id, "Color");
        assert!(split.hierarchy[1].contains("ProductID"));
    }

    #[test]
    fn single_column_table_has_no_parent_variant_split() {
        let headers = vec!["SKU".to_string()];
        let rows: Vec<Vec<Cell>> = (0..4).map(|i| vec![Cell::from(format!("S{i}"))]).collect();
        let table = Table::new(&headers, &rows).expect("table");
        let config = AnalysisConfig::default();
        let stats = profile_columns(&table, &config);
        let ctx = BuildContext::new(&table, &stats, &config, Lexicon::standard());
        let presets = generate_presets(&ctx, &ProductDomain::general(), &[], 0.3, &mut Trace::new());
        let names: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Recommended", "Flat"]);
    }

    #[test]
    fn recommended_preset_mirrors_primary_model_type() {
        assert_eq!(recommended_model_type(&[]), ModelType::Standalone);
        let level = HierarchyLevel {
            level: 1,
            name: "Level 1".to_string(),
            headers: Vec::new(),
            record_id: "A".to_string(),
            record_name: None,
        };
        assert_eq!(
            recommended_model_type(&[level.clone(), level.clone()]),
            ModelType::ParentVariant
        );
        assert_eq!(
            recommended_model_type(&[level.clone(), level.clone(), level]),
            ModelType::MultiLevel
        );
    }
}
