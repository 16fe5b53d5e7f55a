//! Supplier identifiers and the adapter contract.
//!
//! Every supplier feed is handled by one [`SupplierAdapter`]. The run
//! coordinator fetches the adapter's feeds and hands the raw bytes back to it;
//! adapters never perform I/O themselves.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CanonicalRecord, ValidationError};

const MAX_SUPPLIER_ID_LEN: usize = 32;

/// Validated supplier identifier written into the `supplier` log column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SupplierId(String);

impl SupplierId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let value = input.trim();
        if value.is_empty() {
            return Err(ValidationError::EmptySupplierId);
        }
        if value.len() > MAX_SUPPLIER_ID_LEN {
            return Err(ValidationError::SupplierIdTooLong {
                len: value.len(),
                max: MAX_SUPPLIER_ID_LEN,
            });
        }
        for (index, ch) in value.chars().enumerate() {
            if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_') {
                return Err(ValidationError::SupplierIdInvalidChar { ch, index });
            }
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Environment variable consulted for this supplier's feed token.
    pub fn token_env_var(&self) -> String {
        format!(
            "PRICELOG_{}_TOKEN",
            self.0.to_ascii_uppercase().replace('-', "_")
        )
    }
}

impl Display for SupplierId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SupplierId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for SupplierId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SupplierId> for String {
    fn from(value: SupplierId) -> Self {
        value.0
    }
}

/// Feed layouts the crate knows how to adapt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// `<product>` rows with per-warehouse status flags.
    WarehouseStatus,
    /// `<item>` rows plus an auxiliary code-to-category feed.
    MappedCatalog,
    /// `<offer>` rows with a discount flag, validated strictly.
    OfferList,
}

impl FeedKind {
    pub const ALL: [Self; 3] = [Self::WarehouseStatus, Self::MappedCatalog, Self::OfferList];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WarehouseStatus => "warehouse_status",
            Self::MappedCatalog => "mapped_catalog",
            Self::OfferList => "offer_list",
        }
    }
}

impl Display for FeedKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feed URL with its secret token, if any, kept apart for redaction.
#[derive(Clone, PartialEq, Eq)]
pub struct FeedEndpoint {
    url: String,
    secret: Option<String>,
}

impl FeedEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: None,
        }
    }

    /// Substitutes `{token}` in `template` with `token`.
    pub fn with_token(template: &str, token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            url: template.replace("{token}", &token),
            secret: Some(token).filter(|token| !token.is_empty()),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn redacted(&self) -> String {
        match &self.secret {
            Some(secret) => redact_query(&self.url.replace(secret.as_str(), "***")),
            None => redact_query(&self.url),
        }
    }
}

/// Masks every query parameter value in `url` with `***`, keeping names and
/// any `{token}` placeholder. Tokens pasted straight into a configured URL
/// are hidden this way too.
pub fn redact_query(url: &str) -> String {
    let (without_fragment, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let Some((base, query)) = without_fragment.split_once('?') else {
        return url.to_owned();
    };

    let masked = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !value.is_empty() && value != "{token}" => {
                format!("{name}=***")
            }
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&");

    match fragment {
        Some(fragment) => format!("{base}?{masked}#{fragment}"),
        None => format!("{base}?{masked}"),
    }
}

impl std::fmt::Debug for FeedEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FeedEndpoint").field(&self.redacted()).finish()
    }
}

/// Raw bytes fetched for one supplier in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPayload {
    pub products: Vec<u8>,
    /// Auxiliary category feed; `None` when the adapter has none or the fetch failed.
    pub categories: Option<Vec<u8>>,
}

impl FeedPayload {
    pub fn products(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            products: bytes.into(),
            categories: None,
        }
    }

    pub fn with_categories(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.categories = Some(bytes.into());
        self
    }
}

/// Supplier-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierErrorKind {
    Transport,
    MalformedFeed,
    Internal,
}

/// Structured supplier error recorded in run outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplierError {
    kind: SupplierErrorKind,
    message: String,
    retryable: bool,
}

impl SupplierError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: SupplierErrorKind::Transport,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn malformed_feed(message: impl Into<String>) -> Self {
        Self {
            kind: SupplierErrorKind::MalformedFeed,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SupplierErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub const fn kind(&self) -> SupplierErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SupplierErrorKind::Transport => "supplier.transport",
            SupplierErrorKind::MalformedFeed => "supplier.malformed_feed",
            SupplierErrorKind::Internal => "supplier.internal",
        }
    }
}

impl Display for SupplierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SupplierError {}

/// Per-supplier translator from raw feed bytes to canonical records.
///
/// # Contract
///
/// - Empty input, or input with no product elements, yields `Ok(vec![])`.
/// - Structurally broken XML yields [`SupplierErrorKind::MalformedFeed`].
/// - A bad field affects only its own record: it is zero-filled, or, for
///   strictly validating adapters, the record is skipped and logged.
///
/// Implementations must be `Send + Sync`; the coordinator holds them behind `Arc`.
pub trait SupplierAdapter: Send + Sync {
    /// Supplier identifier stamped into every record.
    fn id(&self) -> &SupplierId;

    /// Feed layout this adapter understands.
    fn kind(&self) -> FeedKind;

    /// Main product feed.
    fn feed(&self) -> &FeedEndpoint;

    /// Auxiliary code-to-category feed, for adapters that use one.
    fn category_feed(&self) -> Option<&FeedEndpoint> {
        None
    }

    /// Converts fetched bytes into canonical records.
    fn adapt(&self, payload: &FeedPayload) -> Result<Vec<CanonicalRecord>, SupplierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplier_id_rejects_uppercase_and_spaces() {
        assert!(SupplierId::parse("acalight").is_ok());
        assert!(matches!(
            SupplierId::parse("Aca light"),
            Err(ValidationError::SupplierIdInvalidChar { ch: 'A', index: 0 })
        ));
        assert!(matches!(
            SupplierId::parse("   "),
            Err(ValidationError::EmptySupplierId)
        ));
    }

    #[test]
    fn token_env_var_is_uppercased() {
        let id = SupplierId::parse("north-lights").expect("valid id");
        assert_eq!(id.token_env_var(), "PRICELOG_NORTH_LIGHTS_TOKEN");
    }

    #[test]
    fn endpoint_redacts_token_in_debug_output() {
        let endpoint = FeedEndpoint::with_token("https://feed.example/x.xml?key={token}", "s3cr3t");
        assert_eq!(endpoint.url(), "https://feed.example/x.xml?key=s3cr3t");
        assert_eq!(endpoint.redacted(), "https://feed.example/x.xml?key=***");
        assert!(!format!("{endpoint:?}").contains("s3cr3t"));
    }

    #[test]
    fn inline_query_values_are_masked_without_a_placeholder() {
        let endpoint = FeedEndpoint::new("https://feed.example/x.xml?user=shop&key=s3cr3t#top");
        assert_eq!(
            endpoint.redacted(),
            "https://feed.example/x.xml?user=***&key=***#top"
        );
        assert_eq!(redact_query("https://feed.example/x.xml"), "https://feed.example/x.xml");
        assert_eq!(redact_query("https://feed.example/?flag&k="), "https://feed.example/?flag&k=");
    }
}
