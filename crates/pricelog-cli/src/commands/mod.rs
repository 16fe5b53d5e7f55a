mod diff;
mod run;
mod schema;
mod sources;

use std::path::Path;
use std::time::Instant;

use pricelog_core::{Envelope, EnvelopeError, EnvelopeMeta, PipelineConfig, StoreConfig};
use serde_json::Value;
use uuid::Uuid;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();

    let (name, command_result) = match &cli.command {
        Command::Run(args) => ("run", run::run(args).await?),
        Command::Diff(args) => ("diff", diff::run(args)?),
        Command::Schema(args) => ("schema", schema::run(args)?),
        Command::Sources(args) => ("sources", sources::run(args)?),
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let mut meta = EnvelopeMeta::new(
        Uuid::new_v4().to_string(),
        name,
        started.elapsed().as_millis() as u64,
    )?;
    for warning in warnings {
        meta.push_warning(warning);
    }

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}

/// Pipeline config from `path`, or the built-in default.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

/// Store location: explicit flag, then config, then `PRICELOG_HOME` default.
fn store_config(log: Option<&Path>, config: Option<&PipelineConfig>) -> StoreConfig {
    let explicit = log
        .map(Path::to_path_buf)
        .or_else(|| config.and_then(|config| config.log_path.clone()));
    match explicit {
        Some(path) => StoreConfig::default().with_log_path(path),
        None => StoreConfig::default(),
    }
}
