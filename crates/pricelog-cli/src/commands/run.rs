use std::sync::Arc;

use pricelog_core::{
    EnvelopeError, HistoryStore, ReqwestHttpClient, RunCoordinator, RunReport, SupplierOutcome,
};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;

use super::{load_config, store_config, CommandResult};

pub async fn run(args: &RunArgs) -> Result<CommandResult, CliError> {
    let config = load_config(args.config.as_deref())?;
    let adapters = config.build_adapters()?;
    let coordinator = RunCoordinator::new(adapters, Arc::new(ReqwestHttpClient::new()))
        .with_timeout_ms(config.timeout_ms);

    let report = if args.dry_run {
        coordinator.dry_run().await
    } else {
        let store = HistoryStore::open(store_config(args.log.as_deref(), Some(&config)))?;
        coordinator.run(&store).await?
    };

    info!(
        suppliers = report.suppliers.len(),
        failed = report.failed_suppliers(),
        records = report.records_collected,
        dry_run = report.dry_run,
        "run finished"
    );

    to_command_result(report)
}

fn to_command_result(report: RunReport) -> Result<CommandResult, CliError> {
    let errors = report
        .suppliers
        .iter()
        .filter_map(outcome_error)
        .collect::<Vec<_>>();

    let mut result = CommandResult::ok(serde_json::to_value(&report)?).with_errors(errors);
    if !report.dry_run && report.records_collected == 0 {
        result = result.with_warning("no records collected; history log left untouched");
    }
    if let Some(archived) = report
        .append
        .as_ref()
        .and_then(|append| append.archived_to.as_ref())
    {
        result = result.with_warning(format!(
            "log header did not match the current layout; previous log archived to {}",
            archived.display()
        ));
    }
    Ok(result)
}

fn outcome_error(outcome: &SupplierOutcome) -> Option<EnvelopeError> {
    let code = outcome.error_code?;
    let message = outcome.error.as_deref().unwrap_or("supplier failed");
    let error = EnvelopeError::new(code, message)
        .ok()?
        .with_supplier(outcome.supplier.clone());
    Some(match outcome.retryable {
        Some(retryable) => error.with_retryable(retryable),
        None => error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricelog_core::{FeedKind, OutcomeStatus};

    fn outcome(status: OutcomeStatus, error_code: Option<&'static str>) -> SupplierOutcome {
        SupplierOutcome {
            supplier: String::from("acalight"),
            kind: FeedKind::WarehouseStatus,
            status,
            records: 0,
            latency_ms: 4,
            error_code,
            error: error_code.map(|_| String::from("connection refused")),
            retryable: error_code.map(|_| true),
        }
    }

    #[test]
    fn failed_suppliers_become_envelope_errors() {
        let report = RunReport {
            dry_run: false,
            run_timestamp: None,
            suppliers: vec![
                outcome(OutcomeStatus::Failed, Some("supplier.transport")),
                outcome(OutcomeStatus::Empty, None),
            ],
            records_collected: 0,
            append: None,
        };

        let result = to_command_result(report).expect("result");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].supplier.as_deref(), Some("acalight"));
        assert_eq!(result.errors[0].retryable, Some(true));
        assert_eq!(result.warnings.len(), 1);
    }
}
