//! Date-to-date comparison over the history log.
//!
//! Each selected date is reduced to a snapshot holding the last observation
//! per product code for that date; the two snapshots are then joined on code.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use time::Date;

use crate::history::{History, Observation};
use crate::StoreError;

const HOT_CATEGORY_LIMIT: usize = 10;
const TOP_MOVER_LIMIT: usize = 5;

/// Latest observation per code on one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub products: BTreeMap<String, Observation>,
}

impl Snapshot {
    pub fn for_date(history: &History, date: Date) -> Self {
        let mut products = BTreeMap::new();
        for observation in &history.observations {
            if observation.timestamp.date() == date {
                products.insert(observation.code.clone(), observation.clone());
            }
        }
        Self { products }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn total_stock(&self) -> i64 {
        self.products
            .values()
            .fold(0i64, |total, product| total.saturating_add(product.stock))
    }

    pub fn mean_price(&self) -> f64 {
        if self.products.is_empty() {
            return 0.0;
        }
        let total: f64 = self.products.values().map(|product| product.price).sum();
        total / self.products.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodSummary {
    pub products_start: usize,
    pub products_end: usize,
    pub stock_start: i64,
    pub stock_end: i64,
    pub mean_price_start: f64,
    pub mean_price_end: f64,
}

/// One product whose stock or price moved between the two dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductChange {
    pub code: String,
    pub category_end: String,
    pub stock_end: i64,
    pub stock_diff: i64,
    pub price_end: f64,
    pub price_diff: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub changes: usize,
}

/// Why no per-product diff was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingSnapshot,
    SameDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub start: Date,
    pub end: Date,
    pub summary: PeriodSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub changed: Vec<ProductChange>,
    pub hot_categories: Vec<CategoryCount>,
    pub top_increases: Vec<ProductChange>,
    pub top_decreases: Vec<ProductChange>,
}

/// Compares the snapshots of `start` and `end`.
pub fn compare(history: &History, start: Date, end: Date) -> Result<Comparison, StoreError> {
    if start > end {
        return Err(StoreError::InvalidRange { start, end });
    }

    let start_snapshot = Snapshot::for_date(history, start);
    let end_snapshot = Snapshot::for_date(history, end);
    let summary = PeriodSummary {
        products_start: start_snapshot.len(),
        products_end: end_snapshot.len(),
        stock_start: start_snapshot.total_stock(),
        stock_end: end_snapshot.total_stock(),
        mean_price_start: start_snapshot.mean_price(),
        mean_price_end: end_snapshot.mean_price(),
    };

    let skipped = if start_snapshot.is_empty() || end_snapshot.is_empty() {
        Some(SkipReason::MissingSnapshot)
    } else if start == end {
        Some(SkipReason::SameDate)
    } else {
        None
    };

    let changed = if skipped.is_some() {
        Vec::new()
    } else {
        diff_snapshots(&start_snapshot, &end_snapshot)
    };

    Ok(Comparison {
        start,
        end,
        summary,
        skipped,
        hot_categories: hot_categories(&changed),
        top_increases: top_movers(&changed, |change| change.stock_diff > 0, true),
        top_decreases: top_movers(&changed, |change| change.stock_diff < 0, false),
        changed,
    })
}

/// Inner join on code; keeps rows whose stock or rounded price moved.
pub fn diff_snapshots(start: &Snapshot, end: &Snapshot) -> Vec<ProductChange> {
    start
        .products
        .iter()
        .filter_map(|(code, before)| {
            let after = end.products.get(code)?;
            let stock_diff = after.stock.saturating_sub(before.stock);
            let price_diff = round2(after.price - before.price);
            if stock_diff == 0 && price_diff == 0.0 {
                return None;
            }
            Some(ProductChange {
                code: code.clone(),
                category_end: after.category.clone(),
                stock_end: after.stock,
                stock_diff,
                price_end: after.price,
                price_diff,
            })
        })
        .collect()
}

fn hot_categories(changed: &[ProductChange]) -> Vec<CategoryCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for change in changed {
        *counts.entry(change.category_end.as_str()).or_default() += 1;
    }

    let mut ranked = counts
        .into_iter()
        .map(|(category, changes)| CategoryCount {
            category: category.to_owned(),
            changes,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| b.changes.cmp(&a.changes).then_with(|| a.category.cmp(&b.category)));
    ranked.truncate(HOT_CATEGORY_LIMIT);
    ranked
}

fn top_movers(
    changed: &[ProductChange],
    keep: impl Fn(&ProductChange) -> bool,
    largest_first: bool,
) -> Vec<ProductChange> {
    let mut movers = changed
        .iter()
        .filter(|change| keep(change))
        .cloned()
        .collect::<Vec<_>>();
    if largest_first {
        movers.sort_by(|a, b| b.stock_diff.cmp(&a.stock_diff).then_with(|| a.code.cmp(&b.code)));
    } else {
        movers.sort_by(|a, b| a.stock_diff.cmp(&b.stock_diff).then_with(|| a.code.cmp(&b.code)));
    }
    movers.truncate(TOP_MOVER_LIMIT);
    movers
}

fn round2(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::RunTimestamp;
    use time::macros::date;

    fn observation(ts: &str, code: &str, price: f64, stock: i64, category: &str) -> Observation {
        Observation {
            timestamp: RunTimestamp::parse(ts).expect("timestamp"),
            code: code.to_owned(),
            price,
            stock,
            category: category.to_owned(),
            supplier: None,
            is_discounted: None,
        }
    }

    #[test]
    fn stock_only_change_is_reported_with_zero_price_diff() {
        let history = History {
            observations: vec![
                observation("2026-01-01 09:00:00", "A1", 5.00, 10, "X"),
                observation("2026-01-02 09:00:00", "A1", 5.00, 12, "X"),
            ],
            skipped_rows: 0,
        };

        let comparison =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 02)).expect("compare");

        assert_eq!(comparison.changed.len(), 1);
        let change = &comparison.changed[0];
        assert_eq!(change.stock_diff, 2);
        assert_eq!(change.price_diff, 0.0);
        assert_eq!(comparison.top_increases.len(), 1);
        assert!(comparison.top_decreases.is_empty());
    }

    #[test]
    fn snapshot_keeps_last_entry_per_code_within_a_date() {
        let history = History {
            observations: vec![
                observation("2026-01-01 09:00:00", "A1", 5.0, 10, "X"),
                observation("2026-01-01 18:00:00", "A1", 6.0, 7, "X"),
            ],
            skipped_rows: 0,
        };

        let snapshot = Snapshot::for_date(&history, date!(2026 - 01 - 01));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.products["A1"].stock, 7);
    }

    #[test]
    fn sub_cent_price_noise_is_not_a_change() {
        let history = History {
            observations: vec![
                observation("2026-01-01 09:00:00", "A1", 5.001, 10, "X"),
                observation("2026-01-02 09:00:00", "A1", 5.003, 10, "X"),
            ],
            skipped_rows: 0,
        };

        let comparison =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 02)).expect("compare");
        assert!(comparison.changed.is_empty());
    }

    #[test]
    fn extreme_stock_values_saturate_instead_of_overflowing() {
        let history = History {
            observations: vec![
                observation("2026-01-01 09:00:00", "A1", 1.0, i64::MIN, "X"),
                observation("2026-01-01 09:00:00", "A2", 1.0, i64::MAX, "X"),
                observation("2026-01-01 09:00:00", "A3", 1.0, i64::MAX, "X"),
                observation("2026-01-02 09:00:00", "A1", 1.0, i64::MAX, "X"),
                observation("2026-01-02 09:00:00", "A2", 1.0, i64::MAX, "X"),
                observation("2026-01-02 09:00:00", "A3", 1.0, 5, "X"),
            ],
            skipped_rows: 0,
        };

        let comparison =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 02)).expect("compare");

        assert_eq!(comparison.summary.stock_end, i64::MAX);
        let a1 = comparison
            .changed
            .iter()
            .find(|change| change.code == "A1")
            .expect("A1 changed");
        assert_eq!(a1.stock_diff, i64::MAX);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let error = compare(&History::default(), date!(2026 - 01 - 02), date!(2026 - 01 - 01))
            .expect_err("must fail");
        assert!(matches!(error, StoreError::InvalidRange { .. }));
    }

    #[test]
    fn missing_snapshot_and_same_date_skip_the_diff() {
        let history = History {
            observations: vec![observation("2026-01-01 09:00:00", "A1", 5.0, 10, "X")],
            skipped_rows: 0,
        };

        let missing =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 03)).expect("compare");
        assert_eq!(missing.skipped, Some(SkipReason::MissingSnapshot));

        let same =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 01)).expect("compare");
        assert_eq!(same.skipped, Some(SkipReason::SameDate));
        assert_eq!(same.summary.products_end, 1);
    }

    #[test]
    fn hot_categories_rank_by_change_count() {
        let history = History {
            observations: vec![
                observation("2026-01-01 09:00:00", "A1", 1.0, 1, "Fans"),
                observation("2026-01-01 09:00:00", "A2", 1.0, 1, "Fans"),
                observation("2026-01-01 09:00:00", "B1", 1.0, 5, "Lamps"),
                observation("2026-01-02 09:00:00", "A1", 1.0, 2, "Fans"),
                observation("2026-01-02 09:00:00", "A2", 1.0, 3, "Fans"),
                observation("2026-01-02 09:00:00", "B1", 1.0, 1, "Lamps"),
            ],
            skipped_rows: 0,
        };

        let comparison =
            compare(&history, date!(2026 - 01 - 01), date!(2026 - 01 - 02)).expect("compare");

        assert_eq!(comparison.hot_categories[0].category, "Fans");
        assert_eq!(comparison.hot_categories[0].changes, 2);
        assert_eq!(comparison.top_decreases[0].code, "B1");
        assert_eq!(comparison.top_increases[0].code, "A2");
    }
}
