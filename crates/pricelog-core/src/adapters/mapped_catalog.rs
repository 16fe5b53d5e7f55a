use std::collections::HashMap;

use tracing::{debug, warn};

use crate::category::CategoryResolver;
use crate::feed::{parse_items, FeedError, FieldAliases};
use crate::numeric::{parse_price, parse_quantity};
use crate::supplier::{
    FeedEndpoint, FeedKind, FeedPayload, SupplierAdapter, SupplierError, SupplierId,
};
use crate::CanonicalRecord;

const ITEM_TAGS: &[&str] = &["item"];
const CATEGORY_TAGS: &[&str] = &["category", "entry"];

const CODE: FieldAliases = FieldAliases::new("code", &["sku", "code"]);
const NAME: FieldAliases = FieldAliases::new("name", &["name", "title"]);
const PRICE: FieldAliases = FieldAliases::new("price", &["price", "retail_price"]);
const QUANTITY: FieldAliases = FieldAliases::new("stock", &["quantity", "qty", "stock"]);

const MAP_CODE: FieldAliases = FieldAliases::new("code", &["code", "sku"]);
const MAP_LABEL: FieldAliases = FieldAliases::new("category", &["category", "name"]);

/// `<item>` feed paired with a separate code-to-category feed.
///
/// The category feed is the authoritative tier. When it is missing or
/// unreadable the adapter falls back to the keyword and first-word tiers.
#[derive(Debug, Clone)]
pub struct MappedCatalogAdapter {
    id: SupplierId,
    feed: FeedEndpoint,
    category_feed: Option<FeedEndpoint>,
    resolver: CategoryResolver,
}

impl MappedCatalogAdapter {
    pub fn new(
        id: SupplierId,
        feed: FeedEndpoint,
        category_feed: Option<FeedEndpoint>,
        resolver: CategoryResolver,
    ) -> Self {
        Self {
            id,
            feed,
            category_feed,
            resolver,
        }
    }

    fn category_map(&self, payload: &FeedPayload) -> HashMap<String, String> {
        let Some(bytes) = payload.categories.as_deref() else {
            return HashMap::new();
        };
        match parse_category_map(bytes) {
            Ok(map) => map,
            Err(error) => {
                warn!(supplier = %self.id, %error, "category feed unreadable; using name-based tiers");
                HashMap::new()
            }
        }
    }
}

/// Code-to-category pairs from `<category>` or `<entry>` elements.
///
/// Later duplicates of a code overwrite earlier ones.
pub fn parse_category_map(bytes: &[u8]) -> Result<HashMap<String, String>, FeedError> {
    let mut map = HashMap::new();
    for item in parse_items(bytes, CATEGORY_TAGS)? {
        if let (Some(code), Some(label)) = (item.first_of(&MAP_CODE), item.first_of(&MAP_LABEL)) {
            map.insert(code.to_owned(), label.to_owned());
        }
    }
    Ok(map)
}

impl SupplierAdapter for MappedCatalogAdapter {
    fn id(&self) -> &SupplierId {
        &self.id
    }

    fn kind(&self) -> FeedKind {
        FeedKind::MappedCatalog
    }

    fn feed(&self) -> &FeedEndpoint {
        &self.feed
    }

    fn category_feed(&self) -> Option<&FeedEndpoint> {
        self.category_feed.as_ref()
    }

    fn adapt(&self, payload: &FeedPayload) -> Result<Vec<CanonicalRecord>, SupplierError> {
        let items = parse_items(&payload.products, ITEM_TAGS)
            .map_err(|error| SupplierError::malformed_feed(error.to_string()))?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let resolver = self
            .resolver
            .clone()
            .with_authoritative(self.category_map(payload));

        let records = items
            .iter()
            .map(|item| {
                let code = item.first_of(&CODE).unwrap_or_default();
                let name = item.first_of(&NAME).unwrap_or_default();
                CanonicalRecord::new(
                    code,
                    parse_price(item.first_of(&PRICE)),
                    parse_quantity(item.first_of(&QUANTITY)),
                )
                .with_category(resolver.label(code, name))
                .with_supplier(self.id.as_str())
            })
            .collect::<Vec<_>>();

        debug!(
            supplier = %self.id,
            records = records.len(),
            mapped_codes = resolver.authoritative_len(),
            "adapted mapped catalog feed"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::category::KeywordTable;

    const ITEMS: &str = r#"<?xml version="1.0"?>
        <catalog>
          <item><sku>M-1</sku><name>Λάμπα LED E27</name><price>2.40</price><quantity>30</quantity></item>
          <item><sku>M-2</sku><name>Βάση στήριξης</name><retail_price>7,00</retail_price><qty>-4</qty></item>
        </catalog>"#;

    fn adapter() -> MappedCatalogAdapter {
        MappedCatalogAdapter::new(
            SupplierId::parse("mapped").expect("id"),
            FeedEndpoint::with_token("https://feed.example/items?key={token}", "k"),
            Some(FeedEndpoint::new("https://feed.example/categories")),
            CategoryResolver::new(Arc::new(KeywordTable::builtin())),
        )
    }

    #[test]
    fn category_feed_is_authoritative() {
        let categories = r#"<categories>
            <category code="M-1" name="Bulbs"/>
            <entry><code>M-2</code><category>Accessories</category></entry>
          </categories>"#;
        let payload =
            FeedPayload::products(ITEMS.as_bytes()).with_categories(categories.as_bytes());

        let records = adapter().adapt(&payload).expect("adapt");

        assert_eq!(records[0].category, "Bulbs");
        assert_eq!(records[1].category, "Accessories");
        assert_eq!(records[1].price, 7.0);
        assert_eq!(records[1].stock, 0);
    }

    #[test]
    fn missing_or_broken_category_feed_falls_back_to_name_tiers() {
        let records = adapter()
            .adapt(&FeedPayload::products(ITEMS.as_bytes()))
            .expect("adapt without categories");
        assert_eq!(records[0].category, "Λάμπες");
        assert_eq!(records[1].category, "Βάση");

        let broken = FeedPayload::products(ITEMS.as_bytes())
            .with_categories(&b"<categories><category"[..]);
        let records = adapter().adapt(&broken).expect("adapt with broken categories");
        assert_eq!(records[0].category, "Λάμπες");
    }
}
