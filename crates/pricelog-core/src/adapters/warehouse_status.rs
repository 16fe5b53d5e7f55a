use tracing::debug;

use crate::category::{CategoryResolver, CategoryTier};
use crate::feed::{parse_items, FieldAliases};
use crate::numeric::parse_price;
use crate::stock::StockAggregator;
use crate::supplier::{
    FeedEndpoint, FeedKind, FeedPayload, SupplierAdapter, SupplierError, SupplierId,
};
use crate::CanonicalRecord;

const PRODUCT_TAGS: &[&str] = &["product"];

const CODE: FieldAliases = FieldAliases::new("code", &["code", "Code"]);
const NAME: FieldAliases = FieldAliases::new("name", &["name", "Name", "title", "description"]);
const PRICE: FieldAliases = FieldAliases::new(
    "price",
    &["WholeSalePricegr", "WholeSalePriceGR", "WholesalePrice"],
);
const CATEGORY: FieldAliases = FieldAliases::new("category", &["category", "Category"]);

/// `<product>` feed with per-warehouse status flags and wholesale prices.
///
/// Stock comes from [`StockAggregator`]; a category field in the feed wins,
/// otherwise the keyword and first-word tiers apply.
#[derive(Debug, Clone)]
pub struct WarehouseStatusAdapter {
    id: SupplierId,
    feed: FeedEndpoint,
    stock: StockAggregator,
    resolver: CategoryResolver,
}

impl WarehouseStatusAdapter {
    pub fn new(id: SupplierId, feed: FeedEndpoint, resolver: CategoryResolver) -> Self {
        Self {
            id,
            feed,
            stock: StockAggregator::green_orange(),
            resolver: resolver.with_tiers(&[CategoryTier::Keyword, CategoryTier::Heuristic]),
        }
    }
}

impl SupplierAdapter for WarehouseStatusAdapter {
    fn id(&self) -> &SupplierId {
        &self.id
    }

    fn kind(&self) -> FeedKind {
        FeedKind::WarehouseStatus
    }

    fn feed(&self) -> &FeedEndpoint {
        &self.feed
    }

    fn adapt(&self, payload: &FeedPayload) -> Result<Vec<CanonicalRecord>, SupplierError> {
        let items = parse_items(&payload.products, PRODUCT_TAGS)
            .map_err(|error| SupplierError::malformed_feed(error.to_string()))?;

        let records = items
            .iter()
            .map(|item| {
                let code = item.first_of(&CODE).unwrap_or_default();
                let name = item.first_of(&NAME).unwrap_or_default();
                let category = match item.first_of(&CATEGORY) {
                    Some(category) => category.to_owned(),
                    None => self.resolver.label(code, name),
                };
                let price = parse_price(item.first_of(&PRICE));
                CanonicalRecord::new(code, price, self.stock.aggregate(item))
                    .with_category(category)
                    .with_supplier(self.id.as_str())
            })
            .collect::<Vec<_>>();

        debug!(supplier = %self.id, records = records.len(), "adapted warehouse status feed");
        Ok(records)
    }
}
