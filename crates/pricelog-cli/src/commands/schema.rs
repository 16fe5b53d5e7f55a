use pricelog_core::{inspect_header, HeaderCheck, LogSchema, SchemaVersion};
use serde::Serialize;

use crate::cli::SchemaArgs;
use crate::error::CliError;

use super::{load_config, store_config, CommandResult};

#[derive(Debug, Serialize)]
struct KnownLayout {
    version: SchemaVersion,
    columns: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SchemaResponseData {
    log_path: String,
    current: SchemaVersion,
    columns: &'static [&'static str],
    on_disk: HeaderCheck,
    archive_on_next_append: bool,
    known_layouts: Vec<KnownLayout>,
}

pub fn run(args: &SchemaArgs) -> Result<CommandResult, CliError> {
    let pipeline = load_config(args.config.as_deref())?;
    let config = store_config(args.log.as_deref(), Some(&pipeline));
    let schema = LogSchema::current();
    let on_disk = inspect_header(&config.log_path, schema)?;
    let archive_on_next_append = on_disk.requires_archive();

    let data = SchemaResponseData {
        log_path: config.log_path.display().to_string(),
        current: schema.version(),
        columns: schema.columns(),
        archive_on_next_append,
        on_disk,
        known_layouts: SchemaVersion::ALL
            .into_iter()
            .map(|version| KnownLayout {
                version,
                columns: version.columns(),
            })
            .collect(),
    };

    let mut result = CommandResult::ok(serde_json::to_value(data)?);
    if archive_on_next_append {
        result = result.with_warning("existing log header differs; next run will archive it");
    }
    Ok(result)
}
