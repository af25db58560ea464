//! Column conservation.
//!
//! Every distinct input header must appear exactly once across the final
//! hierarchy, as a header, Record ID or Record Name. A shortfall or surplus
//! is an internal defect: missing columns are appended to the terminal level
//! and both cases are logged, never returned as errors.

use std::collections::{HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    diagnostics::{Stage, Trace},
    hierarchy::{HierarchyLevel, TERMINAL_LEVEL_NAME},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConservationReport {
    /// Input headers that were absent and have been healed into the terminal
    /// level.
    pub missing: Vec<String>,
    /// Headers found in more than one slot.
    pub duplicates: Vec<String>,
    /// Hierarchy members that are not input headers at all.
    pub unknown: Vec<String>,
}

impl ConservationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.duplicates.is_empty() && self.unknown.is_empty()
    }

    pub fn healed(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Checks `levels` against `expected` (distinct input headers in input
/// order) and appends whatever is missing to the terminal level.
pub fn enforce(
    mut levels: Vec<HierarchyLevel>,
    expected: &[&str],
    trace: &mut Trace,
) -> (Vec<HierarchyLevel>, ConservationReport) {
    let mut occurrences: HashMap<&str, usize> = HashMap::new();
    for level in &levels {
        for member in level.members() {
            *occurrences.entry(member).or_insert(0) += 1;
        }
    }
    let expected_set: HashSet<&str> = expected.iter().copied().collect();

    let mut report = ConservationReport {
        missing: expected
            .iter()
            .filter(|header| !occurrences.contains_key(*header))
            .map(|header| header.to_string())
            .collect(),
        ..ConservationReport::default()
    };
    let mut surplus: Vec<(&str, usize)> = occurrences
        .iter()
        .map(|(header, count)| (*header, *count))
        .collect();
    surplus.sort_unstable();
    for (header, count) in surplus {
        if !expected_set.contains(header) {
            report.unknown.push(header.to_string());
        } else if count > 1 {
            report.duplicates.push(header.to_string());
        }
    }

    if !report.duplicates.is_empty() || !report.unknown.is_empty() {
        warn!(
            "Hierarchy conservation surplus: duplicates {:?}, unknown {:?}",
            report.duplicates, report.unknown
        );
        trace.record_with(
            Stage::Conservation,
            "surplus columns in hierarchy",
            json!({ "duplicates": report.duplicates, "unknown": report.unknown }),
        );
    }

    if report.missing.is_empty() {
        trace.record(
            Stage::Conservation,
            format!("all {} column(s) accounted for", expected.len()),
        );
        return (levels, report);
    }

    warn!(
        "Hierarchy lost {} column(s), appending to terminal level: {:?}",
        report.missing.len(),
        report.missing
    );
    trace.record_with(
        Stage::Conservation,
        "healed missing columns into terminal level",
        json!({ "missing": report.missing }),
    );
    match levels.last_mut() {
        Some(terminal) => terminal.headers.extend(report.missing.iter().cloned()),
        None => {
            let mut missing = report.missing.iter().cloned();
            if let Some(record_id) = missing.next() {
                levels.push(HierarchyLevel {
                    level: 1,
                    name: TERMINAL_LEVEL_NAME.to_string(),
                    headers: missing.collect(),
                    record_id,
                    record_name: None,
                });
            }
        }
    }
    (levels, report)
}
