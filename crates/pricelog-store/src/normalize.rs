use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::record::CanonicalRecord;
use crate::schema::LogSchema;

const LOG_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
const ARCHIVE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year][month][day]_[hour][minute][second]");

/// Second-precision instant shared by every row written in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunTimestamp(PrimitiveDateTime);

impl RunTimestamp {
    pub fn now() -> Self {
        Self::from_offset_datetime(OffsetDateTime::now_utc())
    }

    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        let value = value.replace_nanosecond(0).unwrap_or(value);
        Self(PrimitiveDateTime::new(value.date(), value.time()))
    }

    /// Parses the `YYYY-MM-DD HH:MM:SS` form written into the log.
    pub fn parse(input: &str) -> Option<Self> {
        PrimitiveDateTime::parse(input.trim(), LOG_FORMAT)
            .ok()
            .map(Self)
    }

    pub fn date(self) -> time::Date {
        self.0.date()
    }

    pub fn log_value(self) -> String {
        self.0
            .format(LOG_FORMAT)
            .unwrap_or_else(|_| self.0.to_string())
    }

    pub fn archive_suffix(self) -> String {
        self.0
            .format(ARCHIVE_FORMAT)
            .unwrap_or_else(|_| self.0.to_string())
    }
}

impl Display for RunTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.log_value())
    }
}

impl Serialize for RunTimestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.log_value())
    }
}

/// Assembles the ordered field tuple the store writes for each record.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    schema: LogSchema,
    timestamp: RunTimestamp,
}

impl RecordNormalizer {
    pub const fn new(schema: LogSchema, timestamp: RunTimestamp) -> Self {
        Self { schema, timestamp }
    }

    pub const fn timestamp(&self) -> RunTimestamp {
        self.timestamp
    }

    pub fn row(&self, record: &CanonicalRecord) -> Vec<String> {
        self.schema
            .columns()
            .iter()
            .map(|column| self.field(column, record))
            .collect()
    }

    pub fn rows(&self, records: &[CanonicalRecord]) -> Vec<Vec<String>> {
        records.iter().map(|record| self.row(record)).collect()
    }

    fn field(&self, column: &str, record: &CanonicalRecord) -> String {
        match column {
            "datetime" => self.timestamp.log_value(),
            "code" => record.code.clone(),
            "price" => record.price.to_string(),
            "stock" => record.stock.to_string(),
            "category" => record.category.clone(),
            "supplier" => record.supplier.clone(),
            "is_discounted" => record.is_discounted.as_str().to_owned(),
            _ => String::new(),
        }
    }
}
