use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Category label used when no resolver tier produced one.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Discount flag carried by suppliers that publish one.
///
/// Serialized exactly as it appears in the log: `""`, `"YES"` or `"NO"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Discount {
    #[default]
    #[serde(rename = "")]
    Unspecified,
    #[serde(rename = "YES")]
    Yes,
    #[serde(rename = "NO")]
    No,
}

impl Discount {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }

    /// Parses a value read back from the log. Anything unrecognized is unspecified.
    pub fn from_log_value(value: &str) -> Self {
        match value.trim() {
            "YES" => Self::Yes,
            "NO" => Self::No,
            _ => Self::Unspecified,
        }
    }
}

impl Display for Discount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of one supplier product, before it is stamped with a run timestamp.
///
/// Construction enforces the record invariants: price is finite and non-negative,
/// category is never empty, and the code carries no surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub code: String,
    pub price: f64,
    pub stock: u64,
    pub category: String,
    pub supplier: String,
    pub is_discounted: Discount,
}

impl CanonicalRecord {
    pub fn new(code: impl AsRef<str>, price: f64, stock: u64) -> Self {
        Self {
            code: code.as_ref().trim().to_owned(),
            price: clamp_price(price),
            stock,
            category: String::from(UNKNOWN_CATEGORY),
            supplier: String::new(),
            is_discounted: Discount::Unspecified,
        }
    }

    pub fn with_category(mut self, category: impl AsRef<str>) -> Self {
        let category = category.as_ref().trim();
        self.category = if category.is_empty() {
            String::from(UNKNOWN_CATEGORY)
        } else {
            category.to_owned()
        };
        self
    }

    pub fn with_supplier(mut self, supplier: impl Into<String>) -> Self {
        self.supplier = supplier.into();
        self
    }

    pub fn with_discount(mut self, discount: Discount) -> Self {
        self.is_discounted = discount;
        self
    }
}

fn clamp_price(price: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        price
    } else {
        0.0
    }
}
