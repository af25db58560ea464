//! Shared keyword tables for header heuristics.
//!
//! Record-ID detection, Record-Name scoring, item-level relocation, type
//! inference and UoM detection all look at header names. Every list they use
//! lives in one [`Lexicon`] that is handed to each stage, so overlapping
//! concerns (an ID column must not become a Name, a date must not become an
//! ID) read from the same source.

use std::sync::LazyLock;

use heck::ToSnakeCase;
use regex::Regex;

use crate::domain::DomainKind;

static TAXONOMY_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(l\d+|level\s*\d+)$").expect("taxonomy code pattern compiles")
});

/// Header normalised for keyword matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderKey {
    raw: String,
    snake: String,
    /// Lower-case alphanumerics only, so `UoM` and `U.O.M.` both read `uom`.
    compact: String,
    tokens: Vec<String>,
}

impl HeaderKey {
    pub fn new(header: &str) -> Self {
        let raw = header.trim().to_string();
        let snake = raw.to_snake_case();
        let mut tokens: Vec<String> = Vec::new();
        for token in snake.split('_').filter(|token| !token.is_empty()) {
            tokens.push(token.to_string());
            // `ean13` also reads as `ean`.
            let stem = token.trim_end_matches(|c: char| c.is_ascii_digit());
            if stem.len() >= 2 && stem.len() < token.len() {
                tokens.push(stem.to_string());
            }
        }
        let compact = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        Self {
            raw,
            snake,
            compact,
            tokens,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn snake(&self) -> &str {
        &self.snake
    }

    pub fn compact(&self) -> &str {
        &self.compact
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    /// `L1`, `l2`, `Level 3` style taxonomy level columns.
    pub fn is_taxonomy_code(&self) -> bool {
        TAXONOMY_CODE.is_match(&self.raw)
    }
}

/// Substring patterns (matched against the snake_case header) plus whole
/// tokens for short keywords that would otherwise hit inside other words.
///
/// Substrings shorter than [`ANYWHERE_MIN_LEN`] only match at the start of a
/// token, so `date` hits `Ship Date` but not `Validated By`.
#[derive(Debug, Clone, Copy)]
pub struct KeywordSet {
    substrings: &'static [&'static str],
    tokens: &'static [&'static str],
}

impl KeywordSet {
    pub const fn new(substrings: &'static [&'static str], tokens: &'static [&'static str]) -> Self {
        Self { substrings, tokens }
    }

    pub fn first_match(&self, key: &HeaderKey) -> Option<&'static str> {
        self.substrings
            .iter()
            .find(|pattern| substring_matches(key, pattern))
            .or_else(|| self.tokens.iter().find(|token| key.has_token(token)))
            .copied()
    }

    pub fn matches(&self, key: &HeaderKey) -> bool {
        self.first_match(key).is_some()
    }
}

const ANYWHERE_MIN_LEN: usize = 6;

fn substring_matches(key: &HeaderKey, pattern: &str) -> bool {
    let snake = key.snake();
    let in_snake = if pattern.len() >= ANYWHERE_MIN_LEN {
        snake.contains(pattern)
    } else {
        snake
            .match_indices(pattern)
            .any(|(at, _)| at == 0 || snake[..at].ends_with('_'))
    };
    in_snake || (!pattern.contains('_') && key.compact().starts_with(pattern))
}

#[derive(Debug, Clone, Copy)]
pub struct NameBonus {
    pub tokens: &'static [&'static str],
    pub bonus: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DomainKeywords {
    pub kind: DomainKind,
    /// Lower-case fragments counted in headers and sampled values.
    pub keywords: &'static [&'static str],
    /// Columns that vary per item in this domain and never form a level.
    pub variant_axes: KeywordSet,
}

#[derive(Debug, Clone, Copy)]
pub struct Lexicon {
    pub id_keywords: KeywordSet,
    pub id_exclusions: KeywordSet,
    pub name_exclusions: KeywordSet,
    pub item_level_hints: KeywordSet,
    pub date_keywords: KeywordSet,
    pub measurement_keywords: KeywordSet,
    pub uom_column_keywords: KeywordSet,
    pub description_keywords: KeywordSet,
    /// SKU-level Record ID preference, most specific first.
    pub sku_priority: &'static [KeywordSet],
    pub name_bonuses: &'static [NameBonus],
    pub boolean_vocabulary: &'static [&'static str],
    pub domains: &'static [DomainKeywords],
}

impl Lexicon {
    pub fn standard() -> &'static Lexicon {
        &STANDARD
    }

    /// Item-level hint that is not a taxonomy level code column.
    pub fn is_item_level(&self, key: &HeaderKey) -> bool {
        !key.is_taxonomy_code() && self.item_level_hints.matches(key)
    }

    pub fn is_boolean_token(&self, value: &str) -> bool {
        let lowered = value.trim().to_lowercase();
        self.boolean_vocabulary.contains(&lowered.as_str())
    }

    pub fn domain(&self, kind: DomainKind) -> Option<&DomainKeywords> {
        self.domains.iter().find(|entry| entry.kind == kind)
    }
}

static STANDARD: Lexicon = Lexicon {
    id_keywords: KeywordSet::new(
        &[
            "identifier",
            "barcode",
            "article_number",
            "artikelnummer",
            "item_number",
            "part_number",
            "product_number",
        ],
        &[
            "id", "ids", "code", "key", "sku", "ean", "gtin", "upc", "zun", "zuc", "nr", "no",
            "num", "number", "ref", "reference", "article", "artikel", "mpn",
        ],
    ),
    id_exclusions: KeywordSet::new(
        &[
            "date",
            "time",
            "created",
            "updated",
            "modified",
            "description",
            "comment",
            "note",
            "weight",
            "height",
            "width",
            "length",
            "depth",
            "volume",
            "dimension",
            "price",
            "cost",
            "quantity",
            "amount",
            "url",
            "image",
        ],
        &["desc", "text", "size", "qty"],
    ),
    name_exclusions: KeywordSet::new(
        &[
            "pallet",
            "carton",
            "packag",
            "shipping",
            "freight",
            "logistic",
            "gross",
            "tare",
            "uom",
            "unit",
            "weight",
            "height",
            "width",
            "length",
            "depth",
            "volume",
            "dimension",
            "date",
            "time",
            "created",
            "updated",
            "url",
            "link",
            "image",
            "file",
            "path",
            "html",
            "json",
            "xml",
            "flag",
            "status",
            "version",
            "hash",
            "guid",
            "uuid",
            "barcode",
            "identifier",
        ],
        &[
            "id", "code", "key", "sku", "ean", "gtin", "upc", "zun", "zuc", "qty", "kg", "cm",
            "mm", "lb", "oz", "nr", "no", "number", "net", "case", "ref",
        ],
    ),
    item_level_hints: KeywordSet::new(
        &[
            "barcode",
            "dimension",
            "weight",
            "height",
            "width",
            "length",
            "depth",
            "volume",
            "date",
            "expiry",
            "best_before",
            "shelf_life",
            "pallet",
            "carton",
            "packag",
            "logistic",
            "shipping",
            "hs_code",
            "customs",
            "country_of_origin",
            "nutrition",
            "nutrient",
            "calorie",
            "kcal",
            "protein",
            "carbohydrate",
            "sugar",
            "allergen",
            "ingredient",
            "compliance",
            "certific",
            "msds",
            "hazard",
            "colour",
            "color",
        ],
        &[
            "sku", "ean", "gtin", "upc", "zun", "zuc", "size", "fat", "salt", "case", "pack",
        ],
    ),
    date_keywords: KeywordSet::new(
        &[
            "date",
            "datum",
            "time",
            "created",
            "updated",
            "modified",
            "expiry",
            "expiration",
            "launch",
            "release",
            "valid_from",
            "valid_to",
            "valid_until",
            "best_before",
        ],
        &[],
    ),
    measurement_keywords: KeywordSet::new(
        &[
            "weight",
            "gewicht",
            "height",
            "width",
            "length",
            "depth",
            "dimension",
            "diameter",
            "thickness",
            "mass",
        ],
        &[],
    ),
    uom_column_keywords: KeywordSet::new(
        &["uom", "unit_of_measure", "measure_unit", "einheit"],
        &["unit", "units"],
    ),
    description_keywords: KeywordSet::new(&["description", "beschreibung"], &["desc"]),
    sku_priority: &[
        KeywordSet::new(&[], &["sku"]),
        KeywordSet::new(&[], &["zun"]),
        KeywordSet::new(&["gtin"], &[]),
        KeywordSet::new(&["barcode"], &["ean"]),
        KeywordSet::new(&[], &["zuc"]),
        KeywordSet::new(&["item_id"], &["upc", "article"]),
    ],
    name_bonuses: &[
        NameBonus {
            tokens: &["name", "bezeichnung"],
            bonus: 70.0,
        },
        NameBonus {
            tokens: &["title", "titel"],
            bonus: 45.0,
        },
        NameBonus {
            tokens: &["label"],
            bonus: 40.0,
        },
        NameBonus {
            tokens: &["brand", "marke"],
            bonus: 35.0,
        },
    ],
    boolean_vocabulary: &["yes", "no", "y", "n", "true", "false", "ja", "nein"],
    domains: &[
        DomainKeywords {
            kind: DomainKind::Electronics,
            keywords: &[
                "electronic",
                "battery",
                "voltage",
                "watt",
                "usb",
                "hdmi",
                "bluetooth",
                "wifi",
                "processor",
                "cpu",
                "ssd",
                "screen",
                "display",
                "resolution",
                "laptop",
                "smartphone",
                "tablet",
                "camera",
                "charger",
                "mah",
            ],
            variant_axes: KeywordSet::new(&["capacity", "storage", "memory"], &["ram"]),
        },
        DomainKeywords {
            kind: DomainKind::Apparel,
            keywords: &[
                "apparel",
                "clothing",
                "garment",
                "textile",
                "shirt",
                "dress",
                "pants",
                "jeans",
                "jacket",
                "sweater",
                "hoodie",
                "skirt",
                "sock",
                "shoe",
                "sneaker",
                "cotton",
                "polyester",
                "wool",
                "sleeve",
                "collar",
            ],
            variant_axes: KeywordSet::new(&["pattern", "material", "sleeve"], &["fit", "cut"]),
        },
        DomainKeywords {
            kind: DomainKind::Food,
            keywords: &[
                "food",
                "ingredient",
                "allergen",
                "nutrition",
                "calorie",
                "kcal",
                "protein",
                "sugar",
                "organic",
                "gluten",
                "vegan",
                "flavor",
                "flavour",
                "snack",
                "beverage",
                "juice",
                "coffee",
                "chocolate",
                "best before",
                "shelf life",
            ],
            variant_axes: KeywordSet::new(&["flavor", "flavour", "portion"], &[]),
        },
        DomainKeywords {
            kind: DomainKind::Furniture,
            keywords: &[
                "furniture",
                "chair",
                "sofa",
                "couch",
                "desk",
                "shelf",
                "cabinet",
                "wardrobe",
                "mattress",
                "upholstery",
                "oak",
                "walnut",
                "drawer",
                "armchair",
                "stool",
                "bookcase",
                "dresser",
            ],
            variant_axes: KeywordSet::new(&["finish", "fabric", "upholstery"], &[]),
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_key_splits_camel_case_and_punctuation() {
        let key = HeaderKey::new("ProductID");
        assert_eq!(key.snake(), "product_id");
        assert!(key.has_token("id"));

        let key = HeaderKey::new(" Weight (kg) ");
        assert_eq!(key.raw(), "Weight (kg)");
        assert!(key.has_token("kg"));

        let key = HeaderKey::new("UoM");
        assert_eq!(key.compact(), "uom");
        assert!(Lexicon::standard().uom_column_keywords.matches(&key));
    }

    #[test]
    fn taxonomy_codes_are_recognised() {
        assert!(HeaderKey::new("L1").is_taxonomy_code());
        assert!(HeaderKey::new("level 2").is_taxonomy_code());
        assert!(HeaderKey::new("Level3").is_taxonomy_code());
        assert!(!HeaderKey::new("Label").is_taxonomy_code());
    }

    #[test]
    fn short_keywords_only_match_whole_tokens() {
        let lexicon = Lexicon::standard();
        assert!(lexicon.id_keywords.matches(&HeaderKey::new("Item No")));
        assert!(!lexicon.id_keywords.matches(&HeaderKey::new("Notebook Model")));
        assert!(lexicon.item_level_hints.matches(&HeaderKey::new("EAN")));
        assert!(!lexicon.item_level_hints.matches(&HeaderKey::new("Ocean Collection")));
    }

    #[test]
    fn digit_suffixed_codes_match_their_stem() {
        let lexicon = Lexicon::standard();
        let key = HeaderKey::new("EAN13");
        assert!(key.has_token("ean13"));
        assert!(key.has_token("ean"));
        assert!(lexicon.is_item_level(&key));
        assert!(lexicon.is_item_level(&HeaderKey::new("UPC12")));
        let position = |header: &str| {
            let key = HeaderKey::new(header);
            lexicon.sku_priority.iter().position(|set| set.matches(&key))
        };
        assert_eq!(position("EAN13"), Some(3));
        assert_eq!(position("UPC12"), Some(5));
        assert!(!HeaderKey::new("L1").has_token("l"));
    }

    #[test]
    fn short_substrings_only_match_at_token_start() {
        let lexicon = Lexicon::standard();
        assert!(!lexicon.is_item_level(&HeaderKey::new("Validated By")));
        assert!(!lexicon.date_keywords.matches(&HeaderKey::new("Validated By")));
        assert!(lexicon.date_keywords.matches(&HeaderKey::new("Ship Date")));
        assert!(lexicon.date_keywords.matches(&HeaderKey::new("DateAdded")));
        assert!(lexicon.is_item_level(&HeaderKey::new("netweight")));
        assert!(!lexicon.uom_column_keywords.matches(&HeaderKey::new("Community")));
    }

    #[test]
    fn item_level_hints_skip_taxonomy_codes() {
        let lexicon = Lexicon::standard();
        assert!(lexicon.is_item_level(&HeaderKey::new("Net Weight")));
        assert!(lexicon.is_item_level(&HeaderKey::new("Color")));
        assert!(!lexicon.is_item_level(&HeaderKey::new("L1")));
        assert!(!lexicon.is_item_level(&HeaderKey::new("Category")));
    }

    #[test]
    fn sku_priority_orders_identifier_families() {
        let lexicon = Lexicon::standard();
        let position = |header: &str| {
            let key = HeaderKey::new(header);
            lexicon
                .sku_priority
                .iter()
                .position(|set| set.matches(&key))
        };
        assert_eq!(position("SKU"), Some(0));
        assert_eq!(position("GTIN-14"), Some(2));
        assert_eq!(position("EAN 13"), Some(3));
        assert_eq!(position("Article"), Some(5));
    }

    #[test]
    fn boolean_vocabulary_is_case_insensitive() {
        let lexicon = Lexicon::standard();
        assert!(lexicon.is_boolean_token(" YES "));
        assert!(lexicon.is_boolean_token("Nein"));
        assert!(!lexicon.is_boolean_token("maybe"));
    }
}
