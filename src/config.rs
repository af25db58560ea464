//! Analysis thresholds.
//!
//! [`AnalysisConfig`] is an immutable value threaded through every stage. It
//! loads from YAML or JSON (selected by file extension) and every field falls
//! back to its default when omitted.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisOutcome};

pub const DEFAULT_PARENT_THRESHOLD: f64 = 0.02;
pub const DEFAULT_CHILDREN_MIN: f64 = 0.50;
pub const DEFAULT_CHILDREN_MAX: f64 = 0.75;
pub const DEFAULT_SKU_THRESHOLD: f64 = 0.98;
pub const DEFAULT_MIN_PROPERTIES_PER_LEVEL: usize = 6;

/// Tables narrower than this many columns per level cannot reach the
/// configured floor, so the floor shrinks with the table.
const COLUMNS_PER_LEVEL_SHARE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisConfig {
    /// Cardinality at or below which a column is labelled `parent`.
    pub parent_threshold: f64,
    /// Lower bound of the `children` cardinality band.
    pub children_min: f64,
    /// Upper bound of the `children` cardinality band.
    pub children_max: f64,
    /// Cardinality at or above which a column always lands on the SKU level.
    pub sku_threshold: f64,
    /// Minimum member count (headers + Record ID + Record Name) per level.
    pub min_properties_per_level: usize,
    /// Headers the caller pins to the SKU level regardless of statistics.
    pub forced_sku_headers: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            parent_threshold: DEFAULT_PARENT_THRESHOLD,
            children_min: DEFAULT_CHILDREN_MIN,
            children_max: DEFAULT_CHILDREN_MAX,
            sku_threshold: DEFAULT_SKU_THRESHOLD,
            min_properties_per_level: DEFAULT_MIN_PROPERTIES_PER_LEVEL,
            forced_sku_headers: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_parent_threshold(mut self, value: f64) -> Self {
        self.parent_threshold = value;
        self
    }

    pub fn with_children_range(mut self, min: f64, max: f64) -> Self {
        self.children_min = min;
        self.children_max = max;
        self
    }

    pub fn with_sku_threshold(mut self, value: f64) -> Self {
        self.sku_threshold = value;
        self
    }

    pub fn with_min_properties_per_level(mut self, value: usize) -> Self {
        self.min_properties_per_level = value;
        self
    }

    pub fn with_forced_sku_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forced_sku_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> AnalysisOutcome<()> {
        let ratios = [
            ("parentThreshold", self.parent_threshold),
            ("childrenMin", self.children_min),
            ("childrenMax", self.children_max),
            ("skuThreshold", self.sku_threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!(
                    "{name} must be between 0 and 1 (got {value})"
                )));
            }
        }
        if self.children_min > self.children_max {
            return Err(AnalysisError::InvalidConfig(format!(
                "childrenMin ({}) cannot exceed childrenMax ({})",
                self.children_min, self.children_max
            )));
        }
        if self.min_properties_per_level == 0 {
            return Err(AnalysisError::InvalidConfig(
                "minPropertiesPerLevel must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Level floor actually applied to a table with `column_count` columns.
    pub fn effective_min_properties(&self, column_count: usize) -> usize {
        let scaled = (column_count / COLUMNS_PER_LEVEL_SHARE).max(1);
        self.min_properties_per_level.min(scaled).max(1)
    }

    pub fn is_forced_sku(&self, header: &str) -> bool {
        self.forced_sku_headers
            .iter()
            .any(|forced| forced.trim().eq_ignore_ascii_case(header.trim()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config: AnalysisConfig = if is_json {
            serde_json::from_reader(reader).context("Parsing config JSON")?
        } else {
            serde_yaml::from_reader(reader).context("Parsing config YAML")?
        };
        config
            .validate()
            .with_context(|| format!("Validating config from {path:?}"))?;
        Ok(config)
    }
}
