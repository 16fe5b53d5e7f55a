mod mapped_catalog;
mod offer_list;
mod warehouse_status;

pub use mapped_catalog::{parse_category_map, MappedCatalogAdapter};
pub use offer_list::{parse_discount, OfferListAdapter};
pub use warehouse_status::WarehouseStatusAdapter;
