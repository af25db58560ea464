//! Unit-of-measure detection for dimension and weight columns.

use std::{collections::HashMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    keywords::{HeaderKey, Lexicon},
    value::{Table, parse_number},
};

pub const UOM_SAMPLE_SIZE: usize = 10;

static EMBEDDED_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\d(?:[.,]\d+)?\s*(inches|inch|in\b|"|cm\b|mm\b|kg\b|g\b|lbs\b|lb\b|oz\b)"#)
        .expect("unit pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Inch,
    Cm,
    Mm,
    Kg,
    G,
    Lb,
    Oz,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Inch => "inch",
            Unit::Cm => "cm",
            Unit::Mm => "mm",
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::Lb => "lb",
            Unit::Oz => "oz",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "inch" | "inches" | "in" | "\"" => Some(Unit::Inch),
            "cm" => Some(Unit::Cm),
            "mm" => Some(Unit::Mm),
            "kg" => Some(Unit::Kg),
            "g" => Some(Unit::G),
            "lb" | "lbs" => Some(Unit::Lb),
            "oz" => Some(Unit::Oz),
            _ => None,
        }
    }

    /// Units a value in `self` is usually converted to.
    pub fn conversions(&self) -> Vec<Unit> {
        match self {
            Unit::Inch => vec![Unit::Cm, Unit::Mm],
            Unit::Cm => vec![Unit::Mm, Unit::Inch],
            Unit::Mm => vec![Unit::Cm, Unit::Inch],
            Unit::Kg => vec![Unit::G, Unit::Lb],
            Unit::G => vec![Unit::Kg, Unit::Oz],
            Unit::Lb => vec![Unit::Kg, Unit::Oz],
            Unit::Oz => vec![Unit::G, Unit::Lb],
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UomSuggestion {
    pub header: String,
    pub detected_uom: Option<Unit>,
    pub suggested_split: bool,
    pub conversions: Vec<Unit>,
    /// Separate column the unit was read from, if any.
    pub uom_column: Option<String>,
    pub needs_confirmation: bool,
    pub sample_values: Vec<String>,
    pub note: String,
}

fn embedded_unit(value: &str) -> Option<Unit> {
    EMBEDDED_UNIT
        .captures(value)
        .and_then(|captures| captures.get(1))
        .and_then(|token| Unit::parse(token.as_str()))
}

fn header_unit(key: &HeaderKey) -> Option<Unit> {
    key.tokens()
        .iter()
        .filter(|token| token.as_str() != "in")
        .find_map(|token| Unit::parse(token))
}

/// Most frequent entry; ties go to the unit declared first.
fn dominant(counts: &HashMap<Unit, usize>) -> Option<Unit> {
    counts
        .iter()
        .max_by(|(a_unit, a_count), (b_unit, b_count)| {
            a_count.cmp(b_count).then_with(|| b_unit.cmp(a_unit))
        })
        .map(|(unit, _)| *unit)
}

fn uom_column_unit(table: &Table<'_>, column: usize) -> Option<Unit> {
    let counts = table.value_counts(column);
    let mut by_unit: HashMap<Unit, usize> = HashMap::new();
    for (value, count) in counts {
        if let Some(unit) = Unit::parse(&value) {
            *by_unit.entry(unit).or_insert(0) += count;
        }
    }
    dominant(&by_unit)
}

pub fn detect_column(
    table: &Table<'_>,
    column: usize,
    uom_column: Option<usize>,
    lexicon: &Lexicon,
) -> Option<UomSuggestion> {
    let header = table.header(column);
    let key = HeaderKey::new(header);
    if !lexicon.measurement_keywords.matches(&key) || lexicon.uom_column_keywords.matches(&key) {
        return None;
    }
    let samples: Vec<String> = table
        .column_texts(column)
        .flatten()
        .take(UOM_SAMPLE_SIZE)
        .map(|value| value.into_owned())
        .collect();
    if samples.is_empty() {
        return None;
    }

    let suggestion = |detected: Option<Unit>, split: bool, confirm: bool, note: String| UomSuggestion {
        header: header.to_string(),
        detected_uom: detected,
        suggested_split: split,
        conversions: detected.map(|unit| unit.conversions()).unwrap_or_default(),
        uom_column: None,
        needs_confirmation: confirm,
        sample_values: samples.clone(),
        note,
    };

    let mut embedded: HashMap<Unit, usize> = HashMap::new();
    for value in &samples {
        if let Some(unit) = embedded_unit(value) {
            *embedded.entry(unit).or_insert(0) += 1;
        }
    }
    if let Some(unit) = dominant(&embedded) {
        let mixed = embedded.len() > 1;
        let note = if mixed {
            format!("values embed mixed units, {unit} is most common")
        } else {
            format!("values embed the unit {unit}; split into value and unit")
        };
        return Some(suggestion(Some(unit), true, mixed, note));
    }

    if let Some(unit) = header_unit(&key) {
        return Some(suggestion(
            Some(unit),
            false,
            false,
            format!("unit {unit} declared in the header"),
        ));
    }

    if let Some(uom) = uom_column {
        let uom_header = table.header(uom).to_string();
        let detected = uom_column_unit(table, uom);
        let note = match detected {
            Some(unit) => format!("unit {unit} taken from column {uom_header}"),
            None => format!("column {uom_header} holds no recognised unit"),
        };
        let mut result = suggestion(detected, false, detected.is_none(), note);
        result.uom_column = Some(uom_header);
        return Some(result);
    }

    let numeric = samples
        .iter()
        .all(|value| parse_number(value).is_some());
    if numeric {
        return Some(suggestion(
            None,
            false,
            true,
            "numeric values without a unit; confirm the unit of measure".to_string(),
        ));
    }
    None
}

pub fn detect_uom(table: &Table<'_>, lexicon: &Lexicon) -> Vec<UomSuggestion> {
    let uom_column = table
        .distinct_columns()
        .iter()
        .copied()
        .find(|&column| lexicon.uom_column_keywords.matches(&HeaderKey::new(table.header(column))));
    table
        .distinct_columns()
        .iter()
        .filter_map(|&column| detect_column(table, column, uom_column, lexicon))
        .collect()
}
