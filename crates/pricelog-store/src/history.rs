use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;
use tracing::{debug, warn};

use crate::archive::list_archives;
use crate::normalize::RunTimestamp;
use crate::record::{Discount, UNKNOWN_CATEGORY};
use crate::StoreError;

/// One row read back from a log segment, whatever its layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub timestamp: RunTimestamp,
    pub code: String,
    pub price: f64,
    pub stock: i64,
    pub category: String,
    pub supplier: Option<String>,
    pub is_discounted: Option<Discount>,
}

/// Observations in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct History {
    pub observations: Vec<Observation>,
    pub skipped_rows: usize,
}

impl History {
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<time::Date> {
        self.observations
            .iter()
            .map(|observation| observation.timestamp.date())
            .min()
    }

    pub fn last_date(&self) -> Option<time::Date> {
        self.observations
            .iter()
            .map(|observation| observation.timestamp.date())
            .max()
    }

    fn extend(&mut self, other: History) {
        self.observations.extend(other.observations);
        self.skipped_rows += other.skipped_rows;
    }
}

/// Column positions resolved from a segment header by name.
struct Columns {
    datetime: usize,
    code: usize,
    price: Option<usize>,
    stock: Option<usize>,
    category: Option<usize>,
    supplier: Option<usize>,
    is_discounted: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Option<Self> {
        let find = |name: &str| headers.iter().position(|header| header.trim() == name);
        Some(Self {
            datetime: find("datetime")?,
            code: find("code")?,
            price: find("price"),
            stock: find("stock"),
            category: find("category"),
            supplier: find("supplier"),
            is_discounted: find("is_discounted"),
        })
    }
}

/// Read side of the history log.
pub struct HistoryReader;

impl HistoryReader {
    /// Loads the live log. A missing or empty file is an empty history.
    pub fn load(path: &Path) -> Result<History, StoreError> {
        if !path.is_file() {
            debug!(path = %path.display(), "history log absent");
            return Ok(History::default());
        }

        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Ok(History::default());
        }
        let Some(columns) = Columns::resolve(&headers) else {
            return Err(StoreError::MalformedHistory {
                path: path.to_path_buf(),
                reason: String::from("header lacks 'datetime' or 'code' column"),
            });
        };

        let mut history = History::default();
        for row in reader.records() {
            let row = row?;
            match parse_row(&row, &columns) {
                Some(observation) => history.observations.push(observation),
                None => history.skipped_rows += 1,
            }
        }

        if history.skipped_rows > 0 {
            warn!(
                path = %path.display(),
                skipped = history.skipped_rows,
                "skipped history rows with unreadable timestamps"
            );
        }

        Ok(history)
    }

    /// Loads archived segments oldest first, then the live log.
    pub fn load_with_archives(path: &Path) -> Result<History, StoreError> {
        let mut history = History::default();
        for archive in list_archives(path)? {
            match Self::load(&archive) {
                Ok(segment) => history.extend(segment),
                Err(error) => {
                    warn!(archive = %archive.display(), %error, "skipping unreadable archive")
                }
            }
        }
        history.extend(Self::load(path)?);
        Ok(history)
    }
}

fn parse_row(row: &StringRecord, columns: &Columns) -> Option<Observation> {
    let timestamp = RunTimestamp::parse(row.get(columns.datetime)?)?;
    let code = row.get(columns.code)?.trim().to_owned();
    let text = |index: Option<usize>| index.and_then(|index| row.get(index)).map(str::trim);

    let price = text(columns.price)
        .and_then(|value| value.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0);
    let stock = text(columns.stock)
        .and_then(|value| {
            value
                .parse::<i64>()
                .ok()
                .or_else(|| value.parse::<f64>().ok().map(|v| v as i64))
        })
        .unwrap_or(0);
    let category = text(columns.category)
        .filter(|value| !value.is_empty())
        .unwrap_or(UNKNOWN_CATEGORY)
        .to_owned();

    Some(Observation {
        timestamp,
        code,
        price,
        stock,
        category,
        supplier: text(columns.supplier).map(str::to_owned),
        is_discounted: text(columns.is_discounted).map(Discount::from_log_value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn absent_and_empty_logs_read_as_empty_history() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.csv");
        assert!(HistoryReader::load(&path).expect("absent").is_empty());

        fs::write(&path, "").expect("write");
        assert!(HistoryReader::load(&path).expect("empty").is_empty());
    }

    #[test]
    fn oldest_layout_defaults_missing_columns() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.csv");
        fs::write(
            &path,
            "datetime,code,price,stock\n2025-05-01 10:00:00,A1,5.5,4\nbad-date,A2,1,1\n",
        )
        .expect("write");

        let history = HistoryReader::load(&path).expect("load");

        assert_eq!(history.observations.len(), 1);
        assert_eq!(history.skipped_rows, 1);
        let observation = &history.observations[0];
        assert_eq!(observation.category, UNKNOWN_CATEGORY);
        assert_eq!(observation.supplier, None);
        assert_eq!(observation.is_discounted, None);
        assert_eq!(observation.stock, 4);
    }

    #[test]
    fn header_without_code_is_rejected() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("history.csv");
        fs::write(&path, "when,price\n2025-05-01 10:00:00,1\n").expect("write");

        let error = HistoryReader::load(&path).expect_err("must fail");
        assert!(matches!(error, StoreError::MalformedHistory { .. }));
    }
}
