//! Property type inference.
//!
//! Each column is scanned once into a [`PropertyAccumulator`]; `decide` then
//! walks the type checks in fixed priority order and the first one whose
//! ratio clears its bar wins.

use std::{collections::HashMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    keywords::{HeaderKey, Lexicon},
    value::{Cell, Table, looks_like_date},
};

pub const MAX_PICKLIST_VALUES: usize = 50;
const MAX_BOOLEAN_VALUES: usize = 5;
const DATE_RATIO: f64 = 0.7;
const NUMBER_RATIO: f64 = 0.9;
const NUMBER_MIN_UNIQUE: usize = 10;
const PICKLIST_MAX_CARDINALITY: f64 = 0.3;
const ASSET_RATIO: f64 = 0.6;
const LINK_RATIO: f64 = 0.7;
const HTML_RATIO: f64 = 0.5;
const RICH_TEXT_MIN_AVERAGE: f64 = 200.0;

static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?://|www\.)\S+$").expect("url pattern compiles"));
static MEDIA_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpe?g|png|gif|webp|svg|bmp|tiff?|mp4|mov|webm|avi|pdf)(\?\S*)?$")
        .expect("media pattern compiles")
});
static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(\s[^<>]*)?/?>").expect("html pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    YesNo,
    Date,
    Number,
    Picklist,
    DigitalAsset,
    Link,
    Html,
    RichText,
    String,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::YesNo => "yes_no",
            PropertyType::Date => "date",
            PropertyType::Number => "number",
            PropertyType::Picklist => "picklist",
            PropertyType::DigitalAsset => "digital_asset",
            PropertyType::Link => "link",
            PropertyType::Html => "html",
            PropertyType::RichText => "rich_text",
            PropertyType::String => "string",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRecommendation {
    pub header: String,
    pub property_type: PropertyType,
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub picklist_values: Vec<String>,
}

#[derive(Debug, Default)]
struct PropertyAccumulator {
    non_empty: usize,
    boolean_matches: usize,
    date_matches: usize,
    numeric_matches: usize,
    url_matches: usize,
    media_matches: usize,
    html_matches: usize,
    multiline: usize,
    total_length: usize,
    frequencies: HashMap<String, usize>,
}

impl PropertyAccumulator {
    fn update(&mut self, cell: &Cell, lexicon: &Lexicon) {
        let Some(text) = cell.text() else {
            return;
        };
        self.non_empty += 1;
        self.total_length += text.chars().count();
        if lexicon.is_boolean_token(&text) {
            self.boolean_matches += 1;
        }
        if cell.as_number().is_some() {
            self.numeric_matches += 1;
        } else if looks_like_date(&text) {
            self.date_matches += 1;
        }
        if URL.is_match(&text) {
            self.url_matches += 1;
            if MEDIA_FILE.is_match(&text) {
                self.media_matches += 1;
            }
        }
        if HTML_TAG.is_match(&text) {
            self.html_matches += 1;
        }
        if text.contains(['\n', '\t']) {
            self.multiline += 1;
        }
        *self.frequencies.entry(text.into_owned()).or_insert(0) += 1;
    }

    fn ratio(&self, count: usize) -> f64 {
        if self.non_empty == 0 {
            0.0
        } else {
            count as f64 / self.non_empty as f64
        }
    }

    fn unique(&self) -> usize {
        self.frequencies.len()
    }

    fn cardinality(&self) -> f64 {
        self.ratio(self.unique())
    }

    fn average_length(&self) -> f64 {
        self.ratio(self.total_length)
    }

    /// Values ordered by frequency, then alphabetically.
    fn ranked_values(&self, limit: usize) -> Vec<String> {
        let mut ranked: Vec<(&String, &usize)> = self.frequencies.iter().collect();
        ranked.sort_by(|(a_value, a_count), (b_value, b_count)| {
            b_count.cmp(a_count).then_with(|| a_value.cmp(b_value))
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|(value, _)| value.clone())
            .collect()
    }

    fn decide(&self, key: &HeaderKey, lexicon: &Lexicon) -> (PropertyType, f64, String, Vec<String>) {
        if self.non_empty == 0 {
            return (
                PropertyType::String,
                0.3,
                "column has no values".to_string(),
                Vec::new(),
            );
        }
        let unique = self.unique();
        if unique <= MAX_BOOLEAN_VALUES && self.boolean_matches == self.non_empty {
            return (
                PropertyType::YesNo,
                0.95,
                format!("all values are yes/no tokens ({unique} distinct)"),
                Vec::new(),
            );
        }
        let date_ratio = self.ratio(self.date_matches);
        if lexicon.date_keywords.matches(key) && date_ratio > DATE_RATIO {
            return (
                PropertyType::Date,
                (0.6 + 0.35 * date_ratio).min(0.95),
                format!("date-like header with {:.0}% parseable dates", date_ratio * 100.0),
                Vec::new(),
            );
        }
        let numeric_ratio = self.ratio(self.numeric_matches);
        if numeric_ratio > NUMBER_RATIO && unique > NUMBER_MIN_UNIQUE {
            return (
                PropertyType::Number,
                (numeric_ratio * 0.95).min(0.95),
                format!(
                    "{:.0}% numeric values across {unique} distinct values",
                    numeric_ratio * 100.0
                ),
                Vec::new(),
            );
        }
        let cardinality = self.cardinality();
        if unique <= MAX_PICKLIST_VALUES && cardinality < PICKLIST_MAX_CARDINALITY {
            return (
                PropertyType::Picklist,
                (0.9 - cardinality).max(0.6),
                format!("{unique} distinct values repeat across {} rows", self.non_empty),
                self.ranked_values(MAX_PICKLIST_VALUES),
            );
        }
        let media_ratio = self.ratio(self.media_matches);
        if media_ratio > ASSET_RATIO {
            return (
                PropertyType::DigitalAsset,
                0.9,
                format!("{:.0}% of values link to media files", media_ratio * 100.0),
                Vec::new(),
            );
        }
        let url_ratio = self.ratio(self.url_matches);
        if url_ratio > LINK_RATIO {
            return (
                PropertyType::Link,
                0.85,
                format!("{:.0}% of values are URLs", url_ratio * 100.0),
                Vec::new(),
            );
        }
        let html_ratio = self.ratio(self.html_matches);
        if html_ratio > HTML_RATIO {
            return (
                PropertyType::Html,
                0.8,
                format!("{:.0}% of values carry markup tags", html_ratio * 100.0),
                Vec::new(),
            );
        }
        let average = self.average_length();
        if average > RICH_TEXT_MIN_AVERAGE || self.multiline > 0 {
            return (
                PropertyType::RichText,
                0.7,
                format!("long or multi-line text (average {average:.0} characters)"),
                Vec::new(),
            );
        }
        (
            PropertyType::String,
            0.5,
            "no stronger type matched".to_string(),
            Vec::new(),
        )
    }
}

pub fn infer_property(table: &Table<'_>, column: usize, lexicon: &Lexicon) -> PropertyRecommendation {
    let mut accumulator = PropertyAccumulator::default();
    for row in 0..table.row_count() {
        accumulator.update(table.cell(row, column), lexicon);
    }
    let header = table.header(column);
    let (property_type, confidence, reasoning, picklist_values) =
        accumulator.decide(&HeaderKey::new(header), lexicon);
    PropertyRecommendation {
        header: header.to_string(),
        property_type,
        confidence,
        reasoning,
        picklist_values,
    }
}

/// One recommendation per physical column, in header order.
pub fn infer_properties(table: &Table<'_>, lexicon: &Lexicon) -> Vec<PropertyRecommendation> {
    (0..table.column_count())
        .map(|column| infer_property(table, column, lexicon))
        .collect()
}
