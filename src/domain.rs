//! Product domain guess.
//!
//! A keyword vote over headers and a small row sample. The winner only nudges
//! later heuristics (its variant axes never become hierarchy levels); nothing
//! is gated on it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    keywords::{HeaderKey, Lexicon},
    value::Table,
};

pub const DOMAIN_SAMPLE_ROWS: usize = 20;
const MIN_WINNING_SCORE: usize = 3;
const MAX_INDICATORS: usize = 10;
const FLOOR_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DomainKind {
    Electronics,
    Apparel,
    Food,
    Furniture,
    General,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainKind::Electronics => "Electronics",
            DomainKind::Apparel => "Apparel",
            DomainKind::Food => "Food",
            DomainKind::Furniture => "Furniture",
            DomainKind::General => "General",
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDomain {
    #[serde(rename = "type")]
    pub kind: DomainKind,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

impl ProductDomain {
    pub fn general() -> Self {
        Self {
            kind: DomainKind::General,
            confidence: FLOOR_CONFIDENCE,
            indicators: Vec::new(),
        }
    }

    /// Whether `key` names a column that varies per item in this domain.
    pub fn is_variant_axis(&self, key: &HeaderKey, lexicon: &Lexicon) -> bool {
        lexicon
            .domain(self.kind)
            .is_some_and(|entry| entry.variant_axes.matches(key))
    }
}

pub fn classify_domain(table: &Table<'_>, lexicon: &Lexicon) -> ProductDomain {
    let mut texts: Vec<String> = table
        .headers()
        .iter()
        .map(|header| header.to_lowercase())
        .collect();
    for row in 0..table.row_count().min(DOMAIN_SAMPLE_ROWS) {
        for column in 0..table.column_count() {
            if let Some(value) = table.text(row, column) {
                texts.push(value.to_lowercase());
            }
        }
    }

    let mut best: Option<(DomainKind, usize, Vec<String>)> = None;
    for entry in lexicon.domains {
        let mut score = 0usize;
        let mut indicators: Vec<String> = Vec::new();
        for text in &texts {
            for keyword in entry.keywords {
                if text.contains(keyword) {
                    score += 1;
                    if indicators.len() < MAX_INDICATORS
                        && !indicators.iter().any(|known| known == keyword)
                    {
                        indicators.push(keyword.to_string());
                    }
                }
            }
        }
        let improves = match &best {
            Some((_, best_score, _)) => score > *best_score,
            None => true,
        };
        if improves {
            best = Some((entry.kind, score, indicators));
        }
    }

    let Some((kind, score, indicators)) = best else {
        return ProductDomain::general();
    };
    if score == 0 {
        return ProductDomain::general();
    }
    let confidence = (score as f64 / 5.0).min(0.95);
    if score < MIN_WINNING_SCORE {
        return ProductDomain {
            kind: DomainKind::General,
            confidence,
            indicators,
        };
    }
    ProductDomain {
        kind,
        confidence,
        indicators,
    }
}
