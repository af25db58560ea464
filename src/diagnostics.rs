//! Structured trace of the decisions each stage made.
//!
//! Stages append entries instead of printing, so callers and tests can inspect
//! why a column landed where it did.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Profile,
    Domain,
    Levels,
    Build,
    Identity,
    Consolidation,
    Conservation,
    Properties,
    Uom,
    Orphans,
    Taxonomy,
    Presets,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Profile => "profile",
            Stage::Domain => "domain",
            Stage::Levels => "levels",
            Stage::Build => "build",
            Stage::Identity => "identity",
            Stage::Consolidation => "consolidation",
            Stage::Conservation => "conservation",
            Stage::Properties => "properties",
            Stage::Uom => "uom",
            Stage::Orphans => "orphans",
            Stage::Taxonomy => "taxonomy",
            Stage::Presets => "presets",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: Stage,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stage: Stage, message: impl Into<String>) {
        self.record_with(stage, message, Value::Null);
    }

    pub fn record_with(&mut self, stage: Stage, message: impl Into<String>, data: Value) {
        self.entries.push(TraceEntry {
            stage,
            message: message.into(),
            data,
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn for_stage(&self, stage: Stage) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter().filter(move |entry| entry.stage == stage)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
