//! Pipeline configuration and the adapter registry.
//!
//! ```yaml
//! timeout_ms: 30000
//! log_path: /srv/pricelog/data/history.csv
//! suppliers:
//!   - id: acalight
//!     kind: warehouse_status
//!     feed_url: https://b2b.example/export/products.xml
//!   - id: mapped
//!     kind: mapped_catalog
//!     feed_url: https://shop.example/feed?key={token}
//!     category_feed_url: https://shop.example/categories.xml
//! keywords:
//!   - { keyword: ανεμιστηρας, category: Ανεμιστήρες }
//! ```
//!
//! `{token}` in a feed URL is filled from `token`, or from the
//! `PRICELOG_<ID>_TOKEN` environment variable.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::adapters::{MappedCatalogAdapter, OfferListAdapter, WarehouseStatusAdapter};
use crate::category::{default_keyword_rules, CategoryResolver, KeywordRule, KeywordTable};
use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::supplier::{redact_query, FeedEndpoint, FeedKind, SupplierAdapter, SupplierId};
use crate::{CoreError, ValidationError};

const TOKEN_PLACEHOLDER: &str = "{token}";
const DEFAULT_SUPPLIER_ID: &str = "acalight";
const DEFAULT_FEED_URL: &str = "https://acalight.gr/xml/data.xml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub id: String,
    pub kind: FeedKind,
    pub feed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_feed_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl SupplierConfig {
    pub fn new(id: impl Into<String>, kind: FeedKind, feed_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            feed_url: feed_url.into(),
            category_feed_url: None,
            token: None,
            enabled: true,
        }
    }

    pub fn with_category_feed(mut self, url: impl Into<String>) -> Self {
        self.category_feed_url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Copy safe to print: any configured token is masked.
    pub fn redacted(&self) -> Self {
        Self {
            feed_url: redact_query(&self.feed_url),
            category_feed_url: self.category_feed_url.as_deref().map(redact_query),
            token: self.token.as_ref().map(|_| String::from("***")),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    pub suppliers: Vec<SupplierConfig>,
    /// Replaces the built-in keyword table when non-empty.
    pub keywords: Vec<KeywordRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            log_path: None,
            suppliers: vec![SupplierConfig::new(
                DEFAULT_SUPPLIER_ID,
                FeedKind::WarehouseStatus,
                DEFAULT_FEED_URL,
            )],
            keywords: Vec::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, CoreError> {
        Ok(serde_yaml::from_str(input)?)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        debug!(path = %path.display(), suppliers = config.suppliers.len(), "loaded pipeline config");
        Ok(config)
    }

    pub fn keyword_table(&self) -> KeywordTable {
        if self.keywords.is_empty() {
            KeywordTable::new(default_keyword_rules())
        } else {
            KeywordTable::new(self.keywords.iter().cloned())
        }
    }

    /// Adapters for every enabled supplier, tokens read from the process environment.
    pub fn build_adapters(&self) -> Result<Vec<Arc<dyn SupplierAdapter>>, CoreError> {
        self.build_adapters_with(|name| std::env::var(name).ok())
    }

    /// Same as [`Self::build_adapters`] with an explicit environment lookup.
    pub fn build_adapters_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<Arc<dyn SupplierAdapter>>, CoreError> {
        let keywords = Arc::new(self.keyword_table());
        let mut seen = HashSet::new();
        let mut adapters: Vec<Arc<dyn SupplierAdapter>> = Vec::new();

        for supplier in &self.suppliers {
            let id = SupplierId::parse(&supplier.id)?;
            if !seen.insert(id.clone()) {
                return Err(ValidationError::DuplicateSupplier {
                    id: id.to_string(),
                }
                .into());
            }
            if !supplier.enabled {
                debug!(supplier = %id, "supplier disabled; skipping");
                continue;
            }

            let feed = endpoint(&id, &supplier.feed_url, supplier.token.as_deref(), &env)?;
            let resolver = CategoryResolver::new(Arc::clone(&keywords));
            let adapter: Arc<dyn SupplierAdapter> = match supplier.kind {
                FeedKind::WarehouseStatus => {
                    Arc::new(WarehouseStatusAdapter::new(id, feed, resolver))
                }
                FeedKind::MappedCatalog => {
                    let category_feed = supplier
                        .category_feed_url
                        .as_deref()
                        .map(|url| endpoint(&id, url, supplier.token.as_deref(), &env))
                        .transpose()?;
                    Arc::new(MappedCatalogAdapter::new(id, feed, category_feed, resolver))
                }
                FeedKind::OfferList => Arc::new(OfferListAdapter::new(id, feed, resolver)),
            };
            adapters.push(adapter);
        }

        Ok(adapters)
    }
}

fn endpoint(
    id: &SupplierId,
    url: &str,
    token: Option<&str>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<FeedEndpoint, ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyFeedUrl {
            supplier: id.to_string(),
        });
    }
    if !url.contains(TOKEN_PLACEHOLDER) {
        return Ok(FeedEndpoint::new(url));
    }

    let env_var = id.token_env_var();
    let token = token
        .map(str::to_owned)
        .filter(|token| !token.trim().is_empty())
        .or_else(|| env(&env_var).filter(|token| !token.trim().is_empty()))
        .ok_or_else(|| ValidationError::MissingToken {
            supplier: id.to_string(),
            env_var,
        })?;
    Ok(FeedEndpoint::with_token(url, token))
}
