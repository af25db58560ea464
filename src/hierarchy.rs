//! Hierarchy builder.
//!
//! Turns level buckets into ordered level drafts, forces per-item columns to
//! the terminal level, then runs the shared assembly pipeline: bottom-up
//! dedupe, provisional identity, consolidation of under-populated levels,
//! post-consolidation identity and the conservation check. Presets reuse the
//! same assembly so every alternative hierarchy obeys the same rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::AnalysisConfig,
    conservation::{self, ConservationReport},
    diagnostics::{Stage, Trace},
    identity::{self, Identity, IdentitySelector},
    keywords::{HeaderKey, Lexicon},
    levels::LevelBuckets,
    profile::ColumnStat,
    value::Table,
};

pub const TERMINAL_LEVEL_NAME: &str = "SKU-Level Properties";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyLevel {
    pub level: usize,
    pub name: String,
    /// Member columns other than the Record ID and Record Name.
    pub headers: Vec<String>,
    pub record_id: String,
    pub record_name: Option<String>,
}

impl HierarchyLevel {
    /// Record ID, Record Name (when set) and headers, in that order.
    pub fn members(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.record_id.as_str())
            .chain(self.record_name.as_deref())
            .chain(self.headers.iter().map(String::as_str))
    }

    pub fn member_count(&self) -> usize {
        self.headers.len() + 1 + usize::from(self.record_name.is_some())
    }

    pub fn contains(&self, header: &str) -> bool {
        self.members().any(|member| member == header)
    }
}

/// A level before its identity is final: every member column in one list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelDraft {
    pub columns: Vec<String>,
    pub identity: Option<Identity>,
    /// Display name overriding the default `Level N` naming.
    pub label: Option<String>,
}

impl LevelDraft {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            identity: None,
            label: None,
        }
    }

    pub fn labelled(columns: Vec<String>, label: impl Into<String>) -> Self {
        Self {
            columns,
            identity: None,
            label: Some(label.into()),
        }
    }
}

/// Everything the builder reads besides the drafts themselves.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'t, 'a> {
    pub table: &'t Table<'a>,
    pub stats: &'t [ColumnStat],
    pub config: &'t AnalysisConfig,
    pub lexicon: &'t Lexicon,
    /// Effective minimum member count of a non-terminal level.
    pub floor: usize,
}

impl<'t, 'a> BuildContext<'t, 'a> {
    pub fn new(
        table: &'t Table<'a>,
        stats: &'t [ColumnStat],
        config: &'t AnalysisConfig,
        lexicon: &'t Lexicon,
    ) -> Self {
        Self {
            table,
            stats,
            config,
            lexicon,
            floor: config.effective_min_properties(table.distinct_columns().len()),
        }
    }

    pub fn stat(&self, header: &str) -> Option<&'t ColumnStat> {
        self.table
            .column_index(header)
            .and_then(|column| self.stats.get(column))
    }

    fn sort_by_position(&self, columns: &mut [String]) {
        columns.sort_by_key(|header| self.table.column_index(header).unwrap_or(usize::MAX));
    }

    /// Why a column must sit on the terminal level regardless of statistics.
    pub fn terminal_reason(&self, header: &str) -> Option<&'static str> {
        if self.config.is_forced_sku(header) {
            return Some("forced by caller");
        }
        if self
            .table
            .columns_named(header)
            .filter_map(|column| self.stats.get(column))
            .any(|stat| stat.cardinality >= self.config.sku_threshold)
        {
            return Some("cardinality at or above sku threshold");
        }
        if self.lexicon.is_item_level(&HeaderKey::new(header)) {
            return Some("item-level field");
        }
        None
    }

    pub fn selector(&self) -> IdentitySelector<'t, 'a> {
        IdentitySelector::new(self.table, self.stats, self.lexicon)
    }
}

/// Result of assembling drafts into a hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct Assembly {
    pub levels: Vec<HierarchyLevel>,
    pub conservation: ConservationReport,
}

/// Level-1 / Level-2 / terminal drafts from the classifier's buckets.
///
/// Forced columns move to the terminal pool first. A named level that does
/// not reach the floor is deferred into the pool below it.
pub fn partition(ctx: &BuildContext<'_, '_>, buckets: &LevelBuckets, trace: &mut Trace) -> Vec<LevelDraft> {
    let mut terminal: Vec<String> = buckets.sku.clone();
    let keep = |bucket: &[String], terminal: &mut Vec<String>, trace: &mut Trace| {
        let mut kept = Vec::new();
        for header in bucket {
            match ctx.terminal_reason(header) {
                Some(reason) => {
                    trace.record_with(
                        Stage::Build,
                        format!("{header} relocated to terminal level"),
                        json!({ "header": header, "reason": reason }),
                    );
                    terminal.push(header.clone());
                }
                None => kept.push(header.clone()),
            }
        }
        kept
    };
    let mut level1 = keep(&buckets.level1, &mut terminal, trace);
    let mut level2 = keep(&buckets.level2, &mut terminal, trace);

    if !level1.is_empty() && level1.len() < ctx.floor {
        trace.record_with(
            Stage::Build,
            "level 1 below floor, deferred to level 2",
            json!({ "columns": level1, "floor": ctx.floor }),
        );
        level2.append(&mut level1);
    }
    if !level2.is_empty() && level2.len() < ctx.floor {
        trace.record_with(
            Stage::Build,
            "level 2 below floor, deferred to terminal level",
            json!({ "columns": level2, "floor": ctx.floor }),
        );
        terminal.append(&mut level2);
    }

    let mut drafts: Vec<LevelDraft> = [level1, level2, terminal]
        .into_iter()
        .filter(|columns| !columns.is_empty())
        .map(LevelDraft::new)
        .collect();
    for draft in &mut drafts {
        ctx.sort_by_position(&mut draft.columns);
    }
    trace.record_with(
        Stage::Build,
        format!("{} level draft(s)", drafts.len()),
        json!({ "sizes": drafts.iter().map(|d| d.columns.len()).collect::<Vec<_>>() }),
    );
    drafts
}

/// Removes a column from every level above the lowest one holding it, then
/// drops levels left empty.
pub fn dedupe_levels(drafts: &[LevelDraft]) -> Vec<LevelDraft> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut deduped: Vec<LevelDraft> = Vec::with_capacity(drafts.len());
    for draft in drafts.iter().rev() {
        let mut next = draft.clone();
        next.columns.retain(|column| seen.insert(column.clone()));
        if let Some(identity) = &next.identity {
            let id_kept = next.columns.contains(&identity.record_id);
            if !id_kept {
                next.identity = None;
            }
        }
        if !next.columns.is_empty() {
            deduped.push(next);
        }
    }
    deduped.reverse();
    deduped
}

/// Merges every non-terminal level below the floor into the level beneath it
/// until all non-terminal levels reach the floor.
pub fn consolidate(ctx: &BuildContext<'_, '_>, drafts: &[LevelDraft], trace: &mut Trace) -> Vec<LevelDraft> {
    let mut current = dedupe_levels(drafts);
    while let Some(position) = current
        .iter()
        .take(current.len().saturating_sub(1))
        .position(|draft| draft.columns.len() < ctx.floor)
    {
        let absorbed = current.remove(position);
        trace.record_with(
            Stage::Consolidation,
            format!("merged level {} into the level below", position + 1),
            json!({ "columns": absorbed.columns, "floor": ctx.floor }),
        );
        let target = &mut current[position];
        let mut merged = absorbed.columns;
        merged.append(&mut target.columns);
        ctx.sort_by_position(&mut merged);
        target.columns = merged;
        current = dedupe_levels(&current);
    }
    current
}

fn finalize(drafts: &[LevelDraft]) -> Vec<HierarchyLevel> {
    let with_identity: Vec<(&LevelDraft, &Identity)> = drafts
        .iter()
        .filter_map(|draft| draft.identity.as_ref().map(|identity| (draft, identity)))
        .collect();
    let count = with_identity.len();
    with_identity
        .into_iter()
        .enumerate()
        .map(|(position, (draft, identity))| {
            let level = position + 1;
            let name = match &draft.label {
                Some(label) => label.clone(),
                None if level == count => TERMINAL_LEVEL_NAME.to_string(),
                None => format!("Level {level}"),
            };
            let headers = draft
                .columns
                .iter()
                .filter(|column| {
                    **column != identity.record_id
                        && identity.record_name.as_deref() != Some(column.as_str())
                })
                .cloned()
                .collect();
            HierarchyLevel {
                level,
                name,
                headers,
                record_id: identity.record_id.clone(),
                record_name: identity.record_name.clone(),
            }
        })
        .collect()
}

/// Shared pipeline from drafts to a conserved hierarchy.
pub fn assemble(ctx: &BuildContext<'_, '_>, drafts: &[LevelDraft], trace: &mut Trace) -> Assembly {
    let selector = ctx.selector();
    let deduped = dedupe_levels(drafts);
    let provisional = identity::assign_provisional(&selector, &deduped, trace);
    let consolidated = consolidate(ctx, &provisional, trace);
    let assigned = identity::reassign_after_consolidation(&selector, &consolidated, trace);
    let levels = finalize(&assigned);
    let (levels, report) = conservation::enforce(levels, &ctx.table.distinct_headers(), trace);
    Assembly {
        levels,
        conservation: report,
    }
}

pub fn build_hierarchy(ctx: &BuildContext<'_, '_>, buckets: &LevelBuckets, trace: &mut Trace) -> Assembly {
    let drafts = partition(ctx, buckets, trace);
    assemble(ctx, &drafts, trace)
}

const MAX_CONFIDENCE: f64 = 0.95;

/// Confidence in an assembled hierarchy. A single level scales with how well
/// filled the table is and stays below any multi-level result.
pub fn confidence(ctx: &BuildContext<'_, '_>, assembly: &Assembly) -> f64 {
    let levels = &assembly.levels;
    let score = if levels.len() <= 1 {
        let columns = ctx.table.distinct_columns();
        let mean_completeness = if columns.is_empty() {
            0.0
        } else {
            columns
                .iter()
                .filter_map(|&column| ctx.stats.get(column))
                .map(|stat| stat.completeness)
                .sum::<f64>()
                / columns.len() as f64
        };
        0.3 + 0.25 * mean_completeness
    } else {
        let named = levels.iter().filter(|level| level.record_name.is_some()).count();
        0.6 + 0.1 * (levels.len() - 1).min(2) as f64 + 0.1 * named as f64 / levels.len() as f64
    };
    let penalty = if assembly.conservation.healed() { 0.1 } else { 0.0 };
    (score - penalty).clamp(0.0, MAX_CONFIDENCE)
}
