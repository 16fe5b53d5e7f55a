use pricelog_core::{compare, History, HistoryReader, SkipReason, ValidationError};
use serde_json::json;
use time::macros::format_description;
use time::Date;

use crate::cli::DiffArgs;
use crate::error::CliError;

use super::{load_config, store_config, CommandResult};

pub fn run(args: &DiffArgs) -> Result<CommandResult, CliError> {
    let pipeline = load_config(args.config.as_deref())?;
    let config = store_config(args.log.as_deref(), Some(&pipeline));

    let history = if args.with_archives {
        HistoryReader::load_with_archives(&config.log_path)?
    } else {
        HistoryReader::load(&config.log_path)?
    };

    let Some((start, end)) = resolve_range(args.from.as_deref(), args.to.as_deref(), &history)?
    else {
        return Ok(CommandResult::ok(json!({
            "log_path": config.log_path.display().to_string(),
            "observations": 0,
        }))
        .with_warning("history log is empty; nothing to compare yet"));
    };
    let comparison = compare(&history, start, end)?;

    let mut result = CommandResult::ok(serde_json::to_value(&comparison)?);
    match comparison.skipped {
        Some(SkipReason::MissingSnapshot) => {
            result = result.with_warning("one of the dates has no observations; no diff computed");
        }
        Some(SkipReason::SameDate) => {
            result = result.with_warning("start and end are the same date; no diff computed");
        }
        None => {}
    }
    if history.skipped_rows > 0 {
        result = result.with_warning(format!(
            "{} history rows had unreadable timestamps and were ignored",
            history.skipped_rows
        ));
    }
    Ok(result)
}

/// Explicit dates win; a missing bound defaults to the log's first or last
/// date. `None` when a bound is missing and the log has no observations.
fn resolve_range(
    from: Option<&str>,
    to: Option<&str>,
    history: &History,
) -> Result<Option<(Date, Date)>, ValidationError> {
    let start = from.map(parse_date).transpose()?.or_else(|| history.first_date());
    let end = to.map(parse_date).transpose()?.or_else(|| history.last_date());
    Ok(start.zip(end))
}

fn parse_date(value: &str) -> Result<Date, ValidationError> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).map_err(|_| {
        ValidationError::InvalidDate {
            value: value.to_owned(),
        }
    })
}
