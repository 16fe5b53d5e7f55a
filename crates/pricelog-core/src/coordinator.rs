use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::http_client::{HttpClient, HttpRequest, BROWSER_USER_AGENT, DEFAULT_TIMEOUT_MS};
use crate::supplier::{
    FeedEndpoint, FeedKind, FeedPayload, SupplierAdapter, SupplierError, SupplierErrorKind,
};
use crate::{AppendReport, CanonicalRecord, HistoryStore, RunTimestamp, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// At least one record.
    Ok,
    /// Feed fetched and parsed, no products in it.
    Empty,
    /// Feed fetched but not well-formed.
    Malformed,
    /// Transport failure or adapter fault.
    Failed,
}

/// What happened to one supplier during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierOutcome {
    pub supplier: String,
    pub kind: FeedKind,
    pub status: OutcomeStatus,
    pub records: usize,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl SupplierOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed | OutcomeStatus::Malformed)
    }
}

/// Records collected from every supplier, in supplier order.
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    pub records: Vec<CanonicalRecord>,
    pub outcomes: Vec<SupplierOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_timestamp: Option<RunTimestamp>,
    pub suppliers: Vec<SupplierOutcome>,
    pub records_collected: usize,
    /// `None` when nothing was written: dry run or zero records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<AppendReport>,
}

impl RunReport {
    pub fn failed_suppliers(&self) -> usize {
        self.suppliers
            .iter()
            .filter(|outcome| outcome.is_failure())
            .count()
    }
}

/// Fetches every supplier feed, adapts it, and appends the combined batch.
///
/// One supplier failing never stops the others; only a history write
/// failure is an error of the run as a whole.
pub struct RunCoordinator {
    adapters: Vec<Arc<dyn SupplierAdapter>>,
    http_client: Arc<dyn HttpClient>,
    timeout_ms: u64,
}

impl RunCoordinator {
    pub fn new(adapters: Vec<Arc<dyn SupplierAdapter>>, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            adapters,
            http_client,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn adapters(&self) -> &[Arc<dyn SupplierAdapter>] {
        &self.adapters
    }

    /// Runs every adapter and appends the result, stamped with the current time.
    pub async fn run(&self, store: &HistoryStore) -> Result<RunReport, StoreError> {
        self.run_at(store, RunTimestamp::now()).await
    }

    pub async fn run_at(
        &self,
        store: &HistoryStore,
        timestamp: RunTimestamp,
    ) -> Result<RunReport, StoreError> {
        let harvest = self.harvest().await;
        let records_collected = harvest.records.len();

        let append = if records_collected == 0 {
            warn!("no records collected from any supplier; history left untouched");
            None
        } else {
            Some(store.append_at(&harvest.records, timestamp)?)
        };

        Ok(RunReport {
            dry_run: false,
            run_timestamp: Some(timestamp),
            suppliers: harvest.outcomes,
            records_collected,
            append,
        })
    }

    /// Fetches and adapts without writing.
    pub async fn dry_run(&self) -> RunReport {
        let harvest = self.harvest().await;
        RunReport {
            dry_run: true,
            run_timestamp: None,
            records_collected: harvest.records.len(),
            suppliers: harvest.outcomes,
            append: None,
        }
    }

    pub async fn harvest(&self) -> Harvest {
        let mut harvest = Harvest::default();

        for adapter in &self.adapters {
            let started = Instant::now();
            let result = self.collect(adapter.as_ref()).await;
            let latency_ms = started.elapsed().as_millis() as u64;
            let supplier = adapter.id().to_string();

            let outcome = match result {
                Ok(records) => {
                    let status = if records.is_empty() {
                        OutcomeStatus::Empty
                    } else {
                        OutcomeStatus::Ok
                    };
                    info!(supplier = %supplier, records = records.len(), latency_ms, "supplier collected");
                    let outcome = SupplierOutcome {
                        supplier,
                        kind: adapter.kind(),
                        status,
                        records: records.len(),
                        latency_ms,
                        error_code: None,
                        error: None,
                        retryable: None,
                    };
                    harvest.records.extend(records);
                    outcome
                }
                Err(error) => {
                    warn!(
                        supplier = %supplier,
                        code = error.code(),
                        error = error.message(),
                        latency_ms,
                        "supplier contributed no records"
                    );
                    SupplierOutcome {
                        supplier,
                        kind: adapter.kind(),
                        status: match error.kind() {
                            SupplierErrorKind::MalformedFeed => OutcomeStatus::Malformed,
                            _ => OutcomeStatus::Failed,
                        },
                        records: 0,
                        latency_ms,
                        error_code: Some(error.code()),
                        error: Some(error.message().to_owned()),
                        retryable: Some(error.retryable()),
                    }
                }
            };
            harvest.outcomes.push(outcome);
        }

        harvest
    }

    async fn collect(
        &self,
        adapter: &dyn SupplierAdapter,
    ) -> Result<Vec<CanonicalRecord>, SupplierError> {
        let mut payload = FeedPayload::products(self.fetch(adapter.feed()).await?);

        if let Some(category_feed) = adapter.category_feed() {
            match self.fetch(category_feed).await {
                Ok(bytes) => payload.categories = Some(bytes),
                Err(error) => warn!(
                    supplier = %adapter.id(),
                    error = error.message(),
                    "category feed unavailable; continuing without it"
                ),
            }
        }

        catch_unwind(AssertUnwindSafe(|| adapter.adapt(&payload))).unwrap_or_else(|_| {
            Err(SupplierError::internal(format!(
                "{} adapter panicked while parsing the feed",
                adapter.kind()
            )))
        })
    }

    async fn fetch(&self, endpoint: &FeedEndpoint) -> Result<Vec<u8>, SupplierError> {
        let request = HttpRequest::get(endpoint.url())
            .with_header("user-agent", BROWSER_USER_AGENT)
            .with_timeout_ms(self.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            SupplierError::transport(format!("{}: {}", endpoint.redacted(), error.message()))
                .with_retryable(error.retryable())
        })?;

        if !response.is_success() {
            return Err(SupplierError::transport(format!(
                "{} returned HTTP {}",
                endpoint.redacted(),
                response.status
            ))
            .with_retryable(response.status == 429 || response.status >= 500));
        }

        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::StaticHttpClient;
    use crate::supplier::SupplierId;

    struct PanickingAdapter {
        id: SupplierId,
        feed: FeedEndpoint,
    }

    impl SupplierAdapter for PanickingAdapter {
        fn id(&self) -> &SupplierId {
            &self.id
        }

        fn kind(&self) -> FeedKind {
            FeedKind::OfferList
        }

        fn feed(&self) -> &FeedEndpoint {
            &self.feed
        }

        fn adapt(&self, _payload: &FeedPayload) -> Result<Vec<CanonicalRecord>, SupplierError> {
            panic!("unexpected layout");
        }
    }

    #[tokio::test]
    async fn adapter_panic_becomes_failed_outcome() {
        let client = StaticHttpClient::new().with_body("https://feed.example/p.xml", "<offers/>");
        let coordinator = RunCoordinator::new(
            vec![Arc::new(PanickingAdapter {
                id: SupplierId::parse("boom").expect("id"),
                feed: FeedEndpoint::new("https://feed.example/p.xml"),
            })],
            Arc::new(client),
        );

        let report = coordinator.dry_run().await;

        assert_eq!(report.suppliers[0].status, OutcomeStatus::Failed);
        assert_eq!(report.suppliers[0].error_code, Some("supplier.internal"));
        assert_eq!(report.suppliers[0].retryable, Some(false));
        assert_eq!(report.records_collected, 0);
    }

    #[tokio::test]
    async fn non_success_status_is_a_transport_failure() {
        let client = StaticHttpClient::new().with_response(
            "https://feed.example/p.xml",
            crate::http_client::HttpResponse::with_status(403, "denied"),
        );
        let coordinator = RunCoordinator::new(
            vec![Arc::new(PanickingAdapter {
                id: SupplierId::parse("blocked").expect("id"),
                feed: FeedEndpoint::new("https://feed.example/p.xml"),
            })],
            Arc::new(client),
        );

        let report = coordinator.dry_run().await;

        assert_eq!(report.suppliers[0].error_code, Some("supplier.transport"));
        assert!(report.suppliers[0]
            .error
            .as_deref()
            .is_some_and(|error| error.contains("HTTP 403")));
        assert_eq!(report.suppliers[0].retryable, Some(false));
    }

    #[tokio::test]
    async fn server_errors_and_dropped_connections_are_retryable() {
        let client = StaticHttpClient::new()
            .with_response(
                "https://feed.example/a.xml",
                crate::http_client::HttpResponse::with_status(503, "busy"),
            )
            .with_error(
                "https://feed.example/b.xml",
                crate::http_client::HttpError::new("connection reset"),
            )
            .with_error(
                "https://feed.example/c.xml",
                crate::http_client::HttpError::non_retryable("invalid request"),
            );
        let adapter = |id: &str, url: &str| -> Arc<dyn SupplierAdapter> {
            Arc::new(PanickingAdapter {
                id: SupplierId::parse(id).expect("id"),
                feed: FeedEndpoint::new(url),
            })
        };
        let coordinator = RunCoordinator::new(
            vec![
                adapter("busy", "https://feed.example/a.xml"),
                adapter("reset", "https://feed.example/b.xml"),
                adapter("bad", "https://feed.example/c.xml"),
            ],
            Arc::new(client),
        );

        let report = coordinator.dry_run().await;

        let retryable = report
            .suppliers
            .iter()
            .map(|outcome| outcome.retryable)
            .collect::<Vec<_>>();
        assert_eq!(retryable, vec![Some(true), Some(true), Some(false)]);
    }
}
