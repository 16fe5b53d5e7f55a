//! Stock aggregation across warehouses with status flags.
//!
//! Each warehouse reports a status; the status picks which quantity field
//! counts for that warehouse. The product's stock is the sum over warehouses.

use serde::Serialize;

use crate::feed::FeedItem;
use crate::numeric::parse_quantity;

/// One warehouse and the feed field carrying its status flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarehouseSlot {
    pub name: String,
    pub status_field: String,
}

impl WarehouseSlot {
    pub fn new(name: impl Into<String>, status_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_field: status_field.into(),
        }
    }
}

/// Per-warehouse contribution, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseStock {
    pub warehouse: String,
    pub status: String,
    pub quantity: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAggregator {
    warehouses: Vec<WarehouseSlot>,
    sentinel: String,
    matched_field: String,
    fallback_field: String,
}

impl StockAggregator {
    /// `sentinel` is compared case-insensitively against each status.
    pub fn new(
        warehouses: Vec<WarehouseSlot>,
        sentinel: impl Into<String>,
        matched_field: impl Into<String>,
        fallback_field: impl Into<String>,
    ) -> Self {
        Self {
            warehouses,
            sentinel: sentinel.into().trim().to_lowercase(),
            matched_field: matched_field.into(),
            fallback_field: fallback_field.into(),
        }
    }

    /// Three-warehouse layout with green/orange availability bands.
    pub fn green_orange() -> Self {
        Self::new(
            vec![
                WarehouseSlot::new("serres", "SerresStockStatus"),
                WarehouseSlot::new("athens", "AthensStockStatus"),
                WarehouseSlot::new("bulgaria", "BgStockStatus"),
            ],
            "green",
            "B2BGreenFromQty",
            "B2BOrangeFromQty",
        )
    }

    pub fn breakdown(&self, item: &FeedItem) -> Vec<WarehouseStock> {
        self.warehouses
            .iter()
            .map(|slot| {
                let status = item
                    .get(&slot.status_field)
                    .unwrap_or_default()
                    .to_lowercase();
                let field = if status == self.sentinel {
                    &self.matched_field
                } else {
                    &self.fallback_field
                };
                WarehouseStock {
                    warehouse: slot.name.clone(),
                    quantity: parse_quantity(item.get(field)),
                    status,
                }
            })
            .collect()
    }

    pub fn aggregate(&self, item: &FeedItem) -> u64 {
        self.breakdown(item)
            .iter()
            .fold(0u64, |total, slot| total.saturating_add(slot.quantity))
    }
}
