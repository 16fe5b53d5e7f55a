//! Core contracts for pricelog.
//!
//! This crate contains:
//! - Supplier identifiers, the adapter contract and the three feed adapters
//! - Feed parsing, lenient numeric parsing and stock aggregation
//! - Category resolution (supplier map, keyword table, first-word heuristic)
//! - Pipeline configuration and the run coordinator
//! - Response envelope and structured errors
//!
//! Storage types are re-exported from `pricelog-store`.

pub mod adapters;
pub mod category;
pub mod config;
pub mod coordinator;
pub mod envelope;
pub mod error;
pub mod feed;
pub mod http_client;
pub mod numeric;
pub mod stock;
pub mod supplier;

pub use adapters::{MappedCatalogAdapter, OfferListAdapter, WarehouseStatusAdapter};
pub use category::{
    normalize_text, CategoryResolver, CategoryTier, KeywordRule, KeywordTable, Resolution,
};
pub use config::{PipelineConfig, SupplierConfig};
pub use coordinator::{Harvest, OutcomeStatus, RunCoordinator, RunReport, SupplierOutcome};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta, ENVELOPE_SCHEMA_VERSION};
pub use error::{CoreError, ValidationError};
pub use feed::{FeedError, FeedItem, FieldAliases};
pub use http_client::{
    HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient, StaticHttpClient,
};
pub use pricelog_store::{
    compare, inspect_header, AppendReport, CanonicalRecord, CategoryCount, Comparison, Discount,
    HeaderCheck, History, HistoryReader, HistoryStore, LogSchema, Observation, PeriodSummary,
    ProductChange, RecordNormalizer, RunTimestamp, SchemaVersion, SkipReason, Snapshot,
    StoreConfig, StoreError, UNKNOWN_CATEGORY,
};
pub use stock::{StockAggregator, WarehouseSlot};
pub use supplier::{
    redact_query, FeedEndpoint, FeedKind, FeedPayload, SupplierAdapter, SupplierError, SupplierErrorKind,
    SupplierId,
};
