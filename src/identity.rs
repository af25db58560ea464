//! Record ID and Record Name selection.
//!
//! Identity runs in two phases over the level drafts produced by the
//! hierarchy builder: [`assign_provisional`] picks a fresh ID and Name for
//! every level, and [`reassign_after_consolidation`] revisits the merged
//! drafts, keeping earlier choices unless a merge surfaced something
//! strictly better. Both take drafts by reference and return new ones.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    diagnostics::{Stage, Trace},
    hierarchy::LevelDraft,
    keywords::{HeaderKey, Lexicon},
    profile::ColumnStat,
    value::Table,
};

static NUMERIC_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,6}$").expect("numeric code pattern compiles"));
static SHORT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{1,5}$").expect("short token pattern compiles")
});

const STRICT_UNIQUENESS: f64 = 0.95;
const RELAXED_UNIQUENESS: f64 = 0.8;
const STRICT_FILL: f64 = 0.7;
const RELAXED_FILL: f64 = 0.3;
const SHAPE_SHARE: f64 = 0.9;

const EXACT_NAME_BONUS: f64 = 100.0;
const DESCRIPTION_BONUS: f64 = 55.0;
const DESCRIPTION_MAX_PENALTY: f64 = 40.0;
const EXCLUSION_PENALTY: f64 = 200.0;
const COMPLETENESS_WEIGHT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub record_id: String,
    pub record_name: Option<String>,
}

/// Which step of the ID ladder produced a Record ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdRule {
    SkuPriority,
    TaxonomyCode,
    NumericCode,
    ShortToken,
    IdNamed,
    RelaxedUniqueness,
    RelaxedFill,
    IdKeyword,
    FirstEligible,
    FirstColumn,
}

/// Ladder steps tried in order once the SKU priority (terminal level only)
/// found nothing.
const LADDER: [IdRule; 7] = [
    IdRule::TaxonomyCode,
    IdRule::NumericCode,
    IdRule::ShortToken,
    IdRule::IdNamed,
    IdRule::RelaxedUniqueness,
    IdRule::RelaxedFill,
    IdRule::IdKeyword,
];

#[derive(Debug, Clone, PartialEq)]
pub struct IdChoice {
    pub header: String,
    pub rule: IdRule,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameChoice {
    pub header: String,
    pub score: f64,
}

#[derive(Debug)]
struct Candidate<'m> {
    header: &'m str,
    key: HeaderKey,
    fill: f64,
    uniqueness: f64,
    numeric_share: f64,
    token_share: f64,
    has_values: bool,
}

impl Candidate<'_> {
    fn code_shaped(&self) -> bool {
        self.has_values && (self.numeric_share >= SHAPE_SHARE || self.token_share >= SHAPE_SHARE)
    }
}

/// Scores identity candidates against one table.
#[derive(Debug, Clone, Copy)]
pub struct IdentitySelector<'t, 'a> {
    table: &'t Table<'a>,
    stats: &'t [ColumnStat],
    lexicon: &'t Lexicon,
}

impl<'t, 'a> IdentitySelector<'t, 'a> {
    pub fn new(table: &'t Table<'a>, stats: &'t [ColumnStat], lexicon: &'t Lexicon) -> Self {
        Self {
            table,
            stats,
            lexicon,
        }
    }

    fn stat(&self, header: &str) -> Option<&'t ColumnStat> {
        self.table
            .column_index(header)
            .and_then(|column| self.stats.get(column))
    }

    fn is_id_named(&self, key: &HeaderKey) -> bool {
        self.lexicon.id_keywords.matches(key) && !self.lexicon.id_exclusions.matches(key)
    }

    /// Dates, descriptions and measurements never identify a record.
    fn is_id_excluded(&self, key: &HeaderKey) -> bool {
        self.lexicon.id_exclusions.matches(key)
            || self.lexicon.date_keywords.matches(key)
            || self.lexicon.measurement_keywords.matches(key)
            || self.lexicon.description_keywords.matches(key)
    }

    fn is_name_like(&self, key: &HeaderKey) -> bool {
        key.snake() == "name"
            || self.lexicon.description_keywords.matches(key)
            || self
                .lexicon
                .name_bonuses
                .iter()
                .any(|bonus| bonus.tokens.iter().any(|token| key.has_token(token)))
    }

    fn accepts(&self, rule: IdRule, c: &Candidate<'_>) -> bool {
        let id_named = self.is_id_named(&c.key);
        match rule {
            IdRule::TaxonomyCode => c.key.is_taxonomy_code(),
            IdRule::NumericCode => {
                c.has_values && c.numeric_share >= 1.0 && c.uniqueness >= STRICT_UNIQUENESS
            }
            IdRule::ShortToken => {
                c.has_values
                    && c.token_share >= SHAPE_SHARE
                    && id_named
                    && c.fill >= STRICT_FILL
                    && c.uniqueness >= STRICT_UNIQUENESS
            }
            IdRule::IdNamed => {
                id_named && c.fill >= STRICT_FILL && c.uniqueness >= STRICT_UNIQUENESS
            }
            IdRule::RelaxedUniqueness => {
                (id_named || c.code_shaped())
                    && c.fill >= STRICT_FILL
                    && c.uniqueness >= RELAXED_UNIQUENESS
            }
            IdRule::RelaxedFill => {
                (id_named || c.code_shaped())
                    && c.fill >= RELAXED_FILL
                    && c.uniqueness >= RELAXED_UNIQUENESS
            }
            IdRule::IdKeyword => id_named,
            IdRule::SkuPriority | IdRule::FirstEligible | IdRule::FirstColumn => false,
        }
    }

    fn candidate<'m>(&self, header: &'m str, level_tuples: usize) -> Candidate<'m> {
        let key = HeaderKey::new(header);
        let Some(column) = self.table.column_index(header) else {
            return Candidate {
                header,
                key,
                fill: 0.0,
                uniqueness: 0.0,
                numeric_share: 0.0,
                token_share: 0.0,
                has_values: false,
            };
        };
        let values = self.table.non_empty_values(column);
        let share = |pattern: &Regex| {
            if values.is_empty() {
                0.0
            } else {
                values.iter().filter(|value| pattern.is_match(value)).count() as f64
                    / values.len() as f64
            }
        };
        let unique = self.stats.get(column).map_or(0, |stat| stat.unique_count);
        let uniqueness = if level_tuples == 0 {
            0.0
        } else {
            (unique as f64 / level_tuples as f64).min(1.0)
        };
        Candidate {
            header,
            fill: self.stats.get(column).map_or(0.0, |stat| stat.completeness),
            uniqueness,
            numeric_share: share(&NUMERIC_CODE),
            token_share: share(&SHORT_TOKEN),
            has_values: !values.is_empty(),
            key,
        }
    }

    /// Picks the Record ID for a level. Only returns `None` for an empty
    /// member list; otherwise the ladder bottoms out at the first column.
    pub fn select_record_id(
        &self,
        members: &[String],
        terminal: bool,
        reserved: &HashSet<String>,
    ) -> Option<IdChoice> {
        let columns: Vec<usize> = members
            .iter()
            .filter_map(|header| self.table.column_index(header))
            .collect();
        let tuples = self.table.distinct_tuples(&columns);
        let candidates: Vec<Candidate<'_>> = members
            .iter()
            .filter(|header| !reserved.contains(*header))
            .map(|header| self.candidate(header, tuples))
            .collect();
        let eligible: Vec<&Candidate<'_>> = candidates
            .iter()
            .filter(|candidate| !self.is_id_excluded(&candidate.key))
            .collect();

        let choose = |candidate: &Candidate<'_>, rule: IdRule| IdChoice {
            header: candidate.header.to_string(),
            rule,
        };

        if terminal {
            for group in self.lexicon.sku_priority {
                if let Some(found) = eligible
                    .iter()
                    .find(|c| group.matches(&c.key) && !self.is_name_like(&c.key))
                {
                    return Some(choose(found, IdRule::SkuPriority));
                }
            }
        }

        for rule in LADDER {
            if let Some(found) = eligible.iter().find(|c| self.accepts(rule, c)) {
                return Some(choose(found, rule));
            }
        }

        if let Some(first) = eligible.first() {
            return Some(choose(first, IdRule::FirstEligible));
        }
        candidates
            .first()
            .map(|first| choose(first, IdRule::FirstColumn))
            .or_else(|| {
                members.first().map(|header| IdChoice {
                    header: header.clone(),
                    rule: IdRule::FirstColumn,
                })
            })
    }

    /// Name suitability of `header`; `None` when it may not be used at all.
    pub fn name_score(&self, header: &str, reserved: &HashSet<String>) -> Option<f64> {
        if reserved.contains(header) {
            return None;
        }
        let key = HeaderKey::new(header);
        let bonus = if key.snake() == "name" {
            EXACT_NAME_BONUS
        } else if self.lexicon.description_keywords.matches(&key) {
            DESCRIPTION_BONUS - (self.average_length(header) / 20.0).min(DESCRIPTION_MAX_PENALTY)
        } else {
            self.lexicon
                .name_bonuses
                .iter()
                .find(|entry| entry.tokens.iter().any(|token| key.has_token(token)))
                .map_or(0.0, |entry| entry.bonus)
        };
        let mut score = bonus;
        if self.lexicon.name_exclusions.matches(&key) {
            score -= EXCLUSION_PENALTY;
        }
        if bonus > 0.0 {
            score += self.stat(header).map_or(0.0, |stat| stat.completeness) * COMPLETENESS_WEIGHT;
        }
        Some(score)
    }

    fn average_length(&self, header: &str) -> f64 {
        let Some(column) = self.table.column_index(header) else {
            return 0.0;
        };
        let values = self.table.non_empty_values(column);
        if values.is_empty() {
            return 0.0;
        }
        values.iter().map(|value| value.chars().count()).sum::<usize>() as f64
            / values.len() as f64
    }

    /// Best positive-scoring Name among `members`, never the Record ID.
    pub fn select_record_name(
        &self,
        members: &[String],
        record_id: &str,
        reserved: &HashSet<String>,
    ) -> Option<NameChoice> {
        let mut best: Option<NameChoice> = None;
        for header in members.iter().filter(|header| header.as_str() != record_id) {
            let Some(score) = self.name_score(header, reserved) else {
                continue;
            };
            if score <= 0.0 {
                continue;
            }
            if best.as_ref().is_none_or(|current| score > current.score) {
                best = Some(NameChoice {
                    header: header.clone(),
                    score,
                });
            }
        }
        best
    }
}

/// First phase: fresh identity for every draft, top to bottom. Names chosen
/// for upper levels are reserved for the levels below.
pub fn assign_provisional(
    selector: &IdentitySelector<'_, '_>,
    drafts: &[LevelDraft],
    trace: &mut Trace,
) -> Vec<LevelDraft> {
    let mut reserved: HashSet<String> = HashSet::new();
    let last = drafts.len().saturating_sub(1);
    drafts
        .iter()
        .enumerate()
        .map(|(position, draft)| {
            let mut next = draft.clone();
            next.identity = None;
            let Some(id) = selector.select_record_id(&draft.columns, position == last, &reserved)
            else {
                return next;
            };
            let name = selector.select_record_name(&draft.columns, &id.header, &reserved);
            trace.record_with(
                Stage::Identity,
                format!("level {} provisional identity", position + 1),
                json!({
                    "recordId": id.header,
                    "rule": id.rule,
                    "recordName": name.as_ref().map(|choice| choice.header.clone()),
                }),
            );
            if let Some(choice) = &name {
                reserved.insert(choice.header.clone());
            }
            next.identity = Some(Identity {
                record_id: id.header,
                record_name: name.map(|choice| choice.header),
            });
            next
        })
        .collect()
}

/// Second phase, after consolidation. A Record ID that is still a member
/// stays; a Record Name is only replaced by a strictly better candidate.
pub fn reassign_after_consolidation(
    selector: &IdentitySelector<'_, '_>,
    drafts: &[LevelDraft],
    trace: &mut Trace,
) -> Vec<LevelDraft> {
    let mut next: Vec<LevelDraft> = drafts.to_vec();
    let last = next.len().saturating_sub(1);
    for position in 0..next.len() {
        let reserved: HashSet<String> = next
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != position)
            .filter_map(|(_, draft)| draft.identity.as_ref()?.record_name.clone())
            .collect();
        let draft = &next[position];
        let previous = draft.identity.clone();

        let kept_id = previous
            .as_ref()
            .map(|identity| identity.record_id.clone())
            .filter(|id| draft.columns.contains(id) && !reserved.contains(id));
        let record_id = match kept_id {
            Some(id) => id,
            None => match selector.select_record_id(&draft.columns, position == last, &reserved) {
                Some(choice) => choice.header,
                None => continue,
            },
        };

        let current_name = previous
            .as_ref()
            .and_then(|identity| identity.record_name.clone())
            .filter(|name| {
                draft.columns.contains(name) && *name != record_id && !reserved.contains(name)
            });
        let best = selector.select_record_name(&draft.columns, &record_id, &reserved);
        let record_name = match (current_name, best) {
            (Some(current), Some(candidate)) => {
                let current_score = selector
                    .name_score(&current, &reserved)
                    .unwrap_or(f64::NEG_INFINITY);
                if candidate.score > current_score {
                    Some(candidate.header)
                } else {
                    Some(current)
                }
            }
            (Some(current), None) => Some(current),
            (None, candidate) => candidate.map(|choice| choice.header),
        };

        let identity = Identity {
            record_id,
            record_name,
        };
        if previous.as_ref() != Some(&identity) {
            trace.record_with(
                Stage::Identity,
                format!("level {} identity revised after consolidation", position + 1),
                json!({ "recordId": identity.record_id, "recordName": identity.record_name }),
            );
        }
        next[position].identity = Some(identity);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AnalysisConfig, profile::profile_columns, value::Cell};

    struct Fixture {
        headers: Vec<String>,
        rows: Vec<Vec<Cell>>,
    }

    impl Fixture {
        fn new<S: Into<Cell>>(headers: &[&str], rows: Vec<Vec<S>>) -> Self {
            Self {
                headers: headers.iter().map(|h| h.to_string()).collect(),
                rows: rows
                    .into_iter()
                    .map(|row| row.into_iter().map(Into::into).collect())
                    .collect(),
            }
        }

        fn with<R>(&self, check: impl FnOnce(&IdentitySelector<'_, '_>) -> R) -> R {
            let table = Table::new(&self.headers, &self.rows).expect("table");
            let stats = profile_columns(&table, &AnalysisConfig::default());
            let selector = IdentitySelector::new(&table, &stats, Lexicon::standard());
            check(&selector)
        }
    }

    fn members(headers: &[&str]) -> Vec<String> {
        headers.iter().map(|h| h.to_string()).collect()
    }

    fn catalogue() -> Fixture {
        Fixture::new(
            &["Category", "EAN", "SKU", "Product Name", "Description", "Weight"],
            (0..20)
                .map(|i| {
                    let category = if i < 10 { "Shoes" } else { "Bags" };
                    vec![
                        category.to_string(),
                        format!("40000000{i:05}"),
                        format!("SK-{i:03}"),
                        format!("Item {i}"),
                        "A sturdy everyday item".to_string(),
                        "1kg".to_string(),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn terminal_level_prefers_sku_over_ean() {
        let fixture = catalogue();
        let choice = fixture.with(|selector| {
            selector.select_record_id(
                &members(&["EAN", "SKU", "Product Name", "Weight"]),
                true,
                &HashSet::new(),
            )
        });
        let choice = choice.expect("id");
        assert_eq!(choice.header, "SKU");
        assert_eq!(choice.rule, IdRule::SkuPriority);
    }

    #[test]
    fn taxonomy_code_headers_win_first() {
        let fixture = Fixture::new(
            &["Label", "L1"],
            vec![vec!["Shoes", "10"], vec!["Bags", "20"]],
        );
        let choice = fixture
            .with(|selector| {
                selector.select_record_id(&members(&["Label", "L1"]), false, &HashSet::new())
            })
            .expect("id");
        assert_eq!(choice.header, "L1");
        assert_eq!(choice.rule, IdRule::TaxonomyCode);
    }

    #[test]
    fn numeric_codes_must_be_unique_within_the_level() {
        let fixture = Fixture::new(
            &["Group", "Code"],
            vec![
                vec!["Shoes", "101"],
                vec!["Shoes", "101"],
                vec!["Bags", "202"],
            ],
        );
        let choice = fixture
            .with(|selector| {
                selector.select_record_id(&members(&["Group", "Code"]), false, &HashSet::new())
            })
            .expect("id");
        assert_eq!(choice.header, "Code");
        assert_eq!(choice.rule, IdRule::NumericCode);
    }

    #[test]
    fn excluded_columns_fall_through_to_first_column() {
        let fixture = Fixture::new(
            &["Created Date", "Weight"],
            vec![vec!["2024-01-01", "1kg"], vec!["2024-01-02", "2kg"]],
        );
        let choice = fixture
            .with(|selector| {
                selector.select_record_id(
                    &members(&["Created Date", "Weight"]),
                    false,
                    &HashSet::new(),
                )
            })
            .expect("id is mandatory");
        assert_eq!(choice.header, "Created Date");
        assert_eq!(choice.rule, IdRule::FirstColumn);
    }

    #[test]
    fn reserved_names_are_skipped_for_ids() {
        let fixture = Fixture::new(&["Code", "Key"], vec![vec!["1", "a"], vec!["2", "b"]]);
        let reserved: HashSet<String> = ["Code".to_string()].into();
        let choice = fixture
            .with(|selector| selector.select_record_id(&members(&["Code", "Key"]), false, &reserved))
            .expect("id");
        assert_eq!(choice.header, "Key");
    }

    #[test]
    fn exact_name_beats_description_and_brand() {
        let fixture = Fixture::new(
            &["Name", "Description", "Brand"],
            vec![vec!["Boot", "Leather boot", "Acme"]],
        );
        let name = fixture.with(|selector| {
            selector.select_record_name(
                &members(&["Name", "Description", "Brand"]),
                "Brand",
                &HashSet::new(),
            )
        });
        assert_eq!(name.expect("name").header, "Name");
    }

    #[test]
    fn long_descriptions_lose_to_short_titles() {
        let long = "x".repeat(400);
        let fixture = Fixture::new(
            &["Description", "Title"],
            vec![vec![long.as_str(), "Boot"]],
        );
        let name = fixture.with(|selector| {
            selector.select_record_name(&members(&["Description", "Title"]), "", &HashSet::new())
        });
        assert_eq!(name.expect("name").header, "Title");
    }

    #[test]
    fn unsuitable_candidates_leave_the_name_unset() {
        let fixture = Fixture::new(
            &["SKU", "Net Weight", "Pallet Qty", "Color"],
            vec![vec!["A1", "1", "20", "red"]],
        );
        let name = fixture.with(|selector| {
            selector.select_record_name(
                &members(&["SKU", "Net Weight", "Pallet Qty", "Color"]),
                "SKU",
                &HashSet::new(),
            )
        });
        assert_eq!(name, None);
    }

    #[test]
    fn reserved_names_are_rejected_outright() {
        let fixture = Fixture::new(&["Name"], vec![vec!["Boot"]]);
        let reserved: HashSet<String> = ["Name".to_string()].into();
        fixture.with(|selector| {
            assert_eq!(selector.name_score("Name", &reserved), None);
            assert!(selector.name_score("Name", &HashSet::new()).unwrap_or(0.0) > 100.0);
        });
    }

    #[test]
    fn provisional_assignment_reserves_names_top_down() {
        let fixture = catalogue();
        let drafts = vec![
            LevelDraft::new(members(&["Category", "Description"])),
            LevelDraft::new(members(&["EAN", "SKU", "Product Name", "Weight"])),
        ];
        let mut trace = Trace::new();
        let assigned =
            fixture.with(|selector| assign_provisional(selector, &drafts, &mut trace));
        let top = assigned[0].identity.as_ref().expect("top identity");
        assert_eq!(top.record_id, "Category");
        assert_eq!(top.record_name.as_deref(), Some("Description"));
        let bottom = assigned[1].identity.as_ref().expect("bottom identity");
        assert_eq!(bottom.record_id, "SKU");
        assert_eq!(bottom.record_name.as_deref(), Some("Product Name"));
        assert_eq!(trace.for_stage(Stage::Identity).count(), 2);
    }

    #[test]
    fn reassignment_keeps_ids_and_upgrades_names() {
        let fixture = catalogue();
        let mut merged = LevelDraft::new(members(&["Description", "SKU", "Product Name"]));
        merged.identity = Some(Identity {
            record_id: "SKU".to_string(),
            record_name: Some("Description".to_string()),
        });
        let mut trace = Trace::new();
        let revised = fixture.with(|selector| {
            reassign_after_consolidation(selector, std::slice::from_ref(&merged), &mut trace)
        });
        let identity = revised[0].identity.as_ref().expect("identity");
        assert_eq!(identity.record_id, "SKU");
        assert_eq!(identity.record_name.as_deref(), Some("Product Name"));
        assert_eq!(trace.for_stage(Stage::Identity).count(), 1);
    }
}
