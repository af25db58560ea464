//! Level classifier.
//!
//! Buckets every distinct column into a Level-1 candidate, a Level-2
//! candidate, or the SKU level using the profiler's hierarchy score. At most
//! two named levels can come out of this, which keeps the model at three
//! levels and favours Parent + SKU unless the data clearly carries a middle
//! tier.

use serde::{Deserialize, Serialize};

use crate::{
    domain::ProductDomain,
    keywords::{HeaderKey, Lexicon},
    profile::ColumnStat,
    value::Table,
};

pub const LEVEL1_MIN_SCORE: u8 = 75;
pub const LEVEL1_MIN_COMPLETENESS: f64 = 0.85;
pub const LEVEL2_MIN_SCORE: u8 = 50;
pub const LEVEL2_MIN_COMPLETENESS: f64 = 0.80;
pub const LEVEL2_MAX_CARDINALITY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateLevel {
    Level1,
    Level2,
    Sku,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelBuckets {
    pub level1: Vec<String>,
    pub level2: Vec<String>,
    pub sku: Vec<String>,
}

impl LevelBuckets {
    pub fn len(&self) -> usize {
        self.level1.len() + self.level2.len() + self.sku.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Purely statistical bucket for one column.
pub fn score_bucket(stat: &ColumnStat) -> CandidateLevel {
    if stat.hierarchy_score >= LEVEL1_MIN_SCORE && stat.completeness >= LEVEL1_MIN_COMPLETENESS {
        CandidateLevel::Level1
    } else if stat.hierarchy_score >= LEVEL2_MIN_SCORE
        && stat.hierarchy_score < LEVEL1_MIN_SCORE
        && stat.completeness >= LEVEL2_MIN_COMPLETENESS
        && stat.cardinality < LEVEL2_MAX_CARDINALITY
    {
        CandidateLevel::Level2
    } else {
        CandidateLevel::Sku
    }
}

/// Bucket after the domain nudge: variant axes of the detected domain stay on
/// the SKU level even when they repeat like a category.
pub fn candidate_level(stat: &ColumnStat, domain: &ProductDomain, lexicon: &Lexicon) -> CandidateLevel {
    match score_bucket(stat) {
        CandidateLevel::Sku => CandidateLevel::Sku,
        _ if domain.is_variant_axis(&HeaderKey::new(&stat.header), lexicon) => CandidateLevel::Sku,
        bucket => bucket,
    }
}

pub fn classify_levels(
    table: &Table<'_>,
    stats: &[ColumnStat],
    domain: &ProductDomain,
    lexicon: &Lexicon,
) -> LevelBuckets {
    let mut buckets = LevelBuckets::default();
    for &column in table.distinct_columns() {
        let stat = &stats[column];
        let header = stat.header.clone();
        match candidate_level(stat, domain, lexicon) {
            CandidateLevel::Level1 => buckets.level1.push(header),
            CandidateLevel::Level2 => buckets.level2.push(header),
            CandidateLevel::Sku => buckets.sku.push(header),
        }
    }
    buckets
}
