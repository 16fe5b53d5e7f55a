use tracing::{debug, warn};

use crate::category::{CategoryResolver, CategoryTier};
use crate::feed::{parse_items, FeedItem, FieldAliases};
use crate::numeric::{parse_decimal, parse_quantity};
use crate::supplier::{
    FeedEndpoint, FeedKind, FeedPayload, SupplierAdapter, SupplierError, SupplierId,
};
use crate::{CanonicalRecord, Discount};

const OFFER_TAGS: &[&str] = &["offer"];

const CODE: FieldAliases = FieldAliases::new("code", &["id", "code"]);
const NAME: FieldAliases = FieldAliases::new("name", &["title", "name"]);
const PRICE: FieldAliases = FieldAliases::new("price", &["final_price", "price"]);
const QUANTITY: FieldAliases = FieldAliases::new("stock", &["availability", "stock"]);
const CATEGORY: FieldAliases = FieldAliases::new("category", &["category", "category_path"]);
const DISCOUNT: FieldAliases = FieldAliases::new("is_discounted", &["discount", "on_sale"]);

/// `<offer>` feed with a discount flag.
///
/// Validates per record: offers without a code or a usable price are
/// skipped and logged instead of being zero-filled.
#[derive(Debug, Clone)]
pub struct OfferListAdapter {
    id: SupplierId,
    feed: FeedEndpoint,
    resolver: CategoryResolver,
}

impl OfferListAdapter {
    pub fn new(id: SupplierId, feed: FeedEndpoint, resolver: CategoryResolver) -> Self {
        Self {
            id,
            feed,
            resolver: resolver.with_tiers(&[CategoryTier::Keyword, CategoryTier::Heuristic]),
        }
    }

    fn convert(&self, item: &FeedItem) -> Result<CanonicalRecord, String> {
        let code = item
            .first_of(&CODE)
            .ok_or_else(|| format!("missing {}", CODE.field))?;
        let price = item
            .first_of(&PRICE)
            .and_then(parse_decimal)
            .filter(|price| *price >= 0.0)
            .ok_or_else(|| format!("missing or unparseable {}", PRICE.field))?;
        let name = item.first_of(&NAME).unwrap_or_default();
        let category = item
            .first_of(&CATEGORY)
            .and_then(leaf_category)
            .map(str::to_owned)
            .unwrap_or_else(|| self.resolver.label(code, name));

        Ok(CanonicalRecord::new(code, price, parse_quantity(item.first_of(&QUANTITY)))
            .with_category(category)
            .with_supplier(self.id.as_str())
            .with_discount(parse_discount(item.first_of(&DISCOUNT))))
    }
}

/// Last segment of a `Parent > Child` breadcrumb.
fn leaf_category(path: &str) -> Option<&str> {
    path.rsplit('>').map(str::trim).find(|segment| !segment.is_empty())
}

/// Maps the feed's boolean-ish discount flag onto the tri-state log value.
pub fn parse_discount(raw: Option<&str>) -> Discount {
    let Some(raw) = raw else {
        return Discount::Unspecified;
    };
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "ναι" => Discount::Yes,
        "0" | "false" | "no" | "n" | "όχι" | "οχι" => Discount::No,
        _ => Discount::Unspecified,
    }
}

impl SupplierAdapter for OfferListAdapter {
    fn id(&self) -> &SupplierId {
        &self.id
    }

    fn kind(&self) -> FeedKind {
        FeedKind::OfferList
    }

    fn feed(&self) -> &FeedEndpoint {
        &self.feed
    }

    fn adapt(&self, payload: &FeedPayload) -> Result<Vec<CanonicalRecord>, SupplierError> {
        let items = parse_items(&payload.products, OFFER_TAGS)
            .map_err(|error| SupplierError::malformed_feed(error.to_string()))?;

        let mut records = Vec::with_capacity(items.len());
        let mut skipped = 0usize;
        for (position, item) in items.iter().enumerate() {
            match self.convert(item) {
                Ok(record) => records.push(record),
                Err(reason) => {
                    skipped += 1;
                    warn!(
                        supplier = %self.id,
                        position,
                        code = item.first_of(&CODE).unwrap_or("<none>"),
                        %reason,
                        "skipping offer"
                    );
                }
            }
        }

        debug!(supplier = %self.id, records = records.len(), skipped, "adapted offer list feed");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::category::KeywordTable;

    fn adapter() -> OfferListAdapter {
        OfferListAdapter::new(
            SupplierId::parse("offers").expect("id"),
            FeedEndpoint::new("https://feed.example/offers.xml"),
            CategoryResolver::new(Arc::new(KeywordTable::builtin())),
        )
    }

    #[test]
    fn invalid_offers_are_skipped_not_zero_filled() {
        let xml = r#"<offers>
            <offer><id>O-1</id><title>Προβολέας LED 50W</title><final_price>19.90</final_price>
                   <availability>8</availability><discount>1</discount></offer>
            <offer><title>Χωρίς κωδικό</title><final_price>5</final_price></offer>
            <offer><id>O-3</id><title>Χωρίς τιμή</title><final_price>ask</final_price></offer>
          </offers>"#;

        let records = adapter().adapt(&FeedPayload::products(xml.as_bytes())).expect("adapt");

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.code, "O-1");
        assert_eq!(record.price, 19.9);
        assert_eq!(record.stock, 8);
        assert_eq!(record.category, "Προβολείς");
        assert_eq!(record.is_discounted, Discount::Yes);
    }

    #[test]
    fn discount_flag_is_tri_state() {
        assert_eq!(parse_discount(Some("TRUE")), Discount::Yes);
        assert_eq!(parse_discount(Some("Ναι")), Discount::Yes);
        assert_eq!(parse_discount(Some("0")), Discount::No);
        assert_eq!(parse_discount(Some("maybe")), Discount::Unspecified);
        assert_eq!(parse_discount(None), Discount::Unspecified);
    }

    #[test]
    fn breadcrumb_category_uses_its_leaf() {
        let xml = r#"<offers><offer id="O-9" price="3">
            <category>Φωτισμός &gt; Εσωτερικός &gt; Απλίκες</category>
          </offer></offers>"#;

        let records = adapter().adapt(&FeedPayload::products(xml.as_bytes())).expect("adapt");
        assert_eq!(records[0].category, "Απλίκες");
        assert_eq!(records[0].is_discounted, Discount::Unspecified);
    }
}
