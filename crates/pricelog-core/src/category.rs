//! Three-tier category resolution.
//!
//! Tiers run in a fixed order and the first that yields a label wins:
//!
//! 1. [`CategoryTier::Authoritative`]: supplier-provided code-to-category map.
//! 2. [`CategoryTier::Keyword`]: the first keyword rule, in table order, whose
//!    normalized keyword occurs in the normalized product name.
//! 3. [`CategoryTier::Heuristic`]: the first word of the raw name, capitalized.
//!
//! With no tier matching the label is [`UNKNOWN_CATEGORY`].

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::UNKNOWN_CATEGORY;

/// Case-, accent- and punctuation-insensitive form used for keyword matching.
///
/// Idempotent: `normalize_text(normalize_text(s)) == normalize_text(s)`.
pub fn normalize_text(input: &str) -> String {
    let mut folded = String::with_capacity(input.len());
    for ch in input.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        match ch {
            'ς' => folded.push('σ'),
            ch if ch.is_alphanumeric() => folded.push(ch),
            _ => folded.push(' '),
        }
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One configured keyword rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub category: String,
}

impl KeywordRule {
    pub fn new(keyword: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: category.into(),
        }
    }
}

/// Ordered keyword rules with keywords pre-normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    rules: Vec<(String, String)>,
}

impl KeywordTable {
    pub fn new(rules: impl IntoIterator<Item = KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter_map(|rule| {
                let keyword = normalize_text(&rule.keyword);
                let category = rule.category.trim().to_owned();
                (!keyword.is_empty() && !category.is_empty()).then_some((keyword, category))
            })
            .collect();
        Self { rules }
    }

    /// Built-in table for lighting and small-appliance catalogs.
    pub fn builtin() -> Self {
        Self::new(default_keyword_rules())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Category of the first rule whose keyword occurs in `name`.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let haystack = normalize_text(name);
        if haystack.is_empty() {
            return None;
        }
        self.rules
            .iter()
            .find(|(keyword, _)| haystack.contains(keyword.as_str()))
            .map(|(_, category)| category.as_str())
    }
}

pub fn default_keyword_rules() -> Vec<KeywordRule> {
    [
        ("ανεμιστηρας", "Ανεμιστήρες"),
        ("ανεμιστηρες", "Ανεμιστήρες"),
        ("ταινια led", "Ταινίες LED"),
        ("led strip", "Ταινίες LED"),
        ("λαμπα", "Λάμπες"),
        ("λαμπτηρας", "Λάμπες"),
        ("bulb", "Λάμπες"),
        ("προβολεας", "Προβολείς"),
        ("floodlight", "Προβολείς"),
        ("φωτιστικο οροφης", "Φωτιστικά Οροφής"),
        ("κρεμαστο", "Φωτιστικά Οροφής"),
        ("πλαφονιερα", "Φωτιστικά Οροφής"),
        ("απλικα", "Απλίκες"),
        ("επιτραπεζιο", "Επιτραπέζια Φωτιστικά"),
        ("τροφοδοτικο", "Τροφοδοτικά"),
        ("driver", "Τροφοδοτικά"),
        ("καλωδιο", "Καλώδια"),
        ("πριζα", "Πρίζες & Διακόπτες"),
        ("διακοπτης", "Πρίζες & Διακόπτες"),
        ("θερμαστρα", "Θέρμανση"),
    ]
    .into_iter()
    .map(|(keyword, category)| KeywordRule::new(keyword, category))
    .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTier {
    Authoritative,
    Keyword,
    Heuristic,
}

impl CategoryTier {
    pub const ORDER: [Self; 3] = [Self::Authoritative, Self::Keyword, Self::Heuristic];
}

/// Resolved label and the tier that produced it; `tier` is `None` for the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub label: String,
    pub tier: Option<CategoryTier>,
}

/// Deterministic resolver shared by the adapters.
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    authoritative: HashMap<String, String>,
    keywords: Arc<KeywordTable>,
    tiers: Vec<CategoryTier>,
}

impl CategoryResolver {
    pub fn new(keywords: Arc<KeywordTable>) -> Self {
        Self {
            authoritative: HashMap::new(),
            keywords,
            tiers: CategoryTier::ORDER.to_vec(),
        }
    }

    /// Supplier code-to-category map consulted by the first tier.
    pub fn with_authoritative(mut self, map: HashMap<String, String>) -> Self {
        self.authoritative = map
            .into_iter()
            .map(|(code, label)| (code.trim().to_owned(), label.trim().to_owned()))
            .filter(|(code, label)| !code.is_empty() && !label.is_empty())
            .collect();
        self
    }

    /// Restricts resolution to `tiers`, kept in canonical order.
    pub fn with_tiers(mut self, tiers: &[CategoryTier]) -> Self {
        self.tiers = CategoryTier::ORDER
            .into_iter()
            .filter(|tier| tiers.contains(tier))
            .collect();
        self
    }

    pub fn tiers(&self) -> &[CategoryTier] {
        &self.tiers
    }

    pub fn authoritative_len(&self) -> usize {
        self.authoritative.len()
    }

    pub fn resolve(&self, code: &str, name: &str) -> Resolution {
        for tier in &self.tiers {
            if let Some(label) = self.attempt(*tier, code, name) {
                return Resolution {
                    label,
                    tier: Some(*tier),
                };
            }
        }
        Resolution {
            label: String::from(UNKNOWN_CATEGORY),
            tier: None,
        }
    }

    pub fn label(&self, code: &str, name: &str) -> String {
        self.resolve(code, name).label
    }

    fn attempt(&self, tier: CategoryTier, code: &str, name: &str) -> Option<String> {
        match tier {
            CategoryTier::Authoritative => self.authoritative.get(code.trim()).cloned(),
            CategoryTier::Keyword => self.keywords.lookup(name).map(str::to_owned),
            CategoryTier::Heuristic => first_word_label(name),
        }
    }
}

/// First whitespace-delimited token of `name`, first letter upper, rest lower.
fn first_word_label(name: &str) -> Option<String> {
    let word = name.split_whitespace().next()?;
    let mut chars = word.chars();
    let first = chars.next()?;
    let mut label = first.to_uppercase().collect::<String>();
    label.push_str(&chars.as_str().to_lowercase());
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> CategoryResolver {
        CategoryResolver::new(Arc::new(KeywordTable::builtin()))
    }

    #[test]
    fn normalization_folds_case_accents_and_punctuation() {
        assert_eq!(normalize_text("  ΑΝΕΜΙΣΤΉΡΑΣ-Οροφής!! "), "ανεμιστηρασ οροφησ");
        assert_eq!(normalize_text("Ταινία   LED, 5m"), "ταινια led 5m");
        let once = normalize_text("Φωτιστικό Οροφής «Ελιά»");
        assert_eq!(normalize_text(&once), once);
    }

    #[test]
    fn accented_uppercase_name_hits_unaccented_keyword() {
        let resolution = resolver().resolve("X1", "ΑΝΕΜΙΣΤΉΡΑΣ οροφής 3 ταχυτήτων");
        assert_eq!(resolution.label, "Ανεμιστήρες");
        assert_eq!(resolution.tier, Some(CategoryTier::Keyword));
    }

    #[test]
    fn authoritative_map_wins_over_keywords() {
        let resolver = resolver().with_authoritative(HashMap::from([(
            String::from("X1"),
            String::from("Supplier Fans"),
        )]));
        let resolution = resolver.resolve("X1", "Ανεμιστήρας");
        assert_eq!(resolution.label, "Supplier Fans");
        assert_eq!(resolution.tier, Some(CategoryTier::Authoritative));
    }

    #[test]
    fn heuristic_capitalizes_first_word() {
        let resolution = resolver().resolve("Z9", "hAMMER drill 800W");
        assert_eq!(resolution.label, "Hammer");
        assert_eq!(resolution.tier, Some(CategoryTier::Heuristic));
    }

    #[test]
    fn blank_name_without_map_entry_is_unknown() {
        let resolution = resolver().resolve("Z9", "   ");
        assert_eq!(resolution.label, UNKNOWN_CATEGORY);
        assert_eq!(resolution.tier, None);
    }

    #[test]
    fn first_matching_rule_in_table_order_wins() {
        let table = KeywordTable::new([
            KeywordRule::new("led", "LED"),
            KeywordRule::new("ταινια led", "Ταινίες LED"),
        ]);
        assert_eq!(table.lookup("Ταινία LED 5m"), Some("LED"));
    }

    #[test]
    fn restricted_tiers_skip_the_heuristic() {
        let resolver = resolver().with_tiers(&[CategoryTier::Keyword]);
        assert_eq!(resolver.label("Z9", "Hammer drill"), UNKNOWN_CATEGORY);
    }
}
