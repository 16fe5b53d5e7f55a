use pricelog_core::{FeedKind, SupplierId};
use serde::Serialize;

use crate::cli::SourcesArgs;
use crate::error::CliError;

use super::{load_config, CommandResult};

#[derive(Debug, Serialize)]
struct SourceEntry {
    id: SupplierId,
    kind: FeedKind,
    enabled: bool,
    feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    category_feed_url: Option<String>,
    token_configured: bool,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    timeout_ms: u64,
    keyword_rules: usize,
    suppliers: Vec<SourceEntry>,
}

pub fn run(args: &SourcesArgs) -> Result<CommandResult, CliError> {
    let config = load_config(args.config.as_deref())?;
    let mut warnings = Vec::new();

    let mut suppliers = Vec::with_capacity(config.suppliers.len());
    for supplier in &config.suppliers {
        let id = SupplierId::parse(&supplier.id)?;
        let token_configured = supplier.token.is_some()
            || std::env::var_os(id.token_env_var()).is_some();
        if supplier.feed_url.contains("{token}") && !token_configured {
            warnings.push(format!(
                "supplier '{id}' needs a token; set {}",
                id.token_env_var()
            ));
        }

        let redacted = supplier.redacted();
        if !supplier.feed_url.contains("{token}") && redacted.feed_url != supplier.feed_url {
            warnings.push(format!(
                "supplier '{id}' feed URL carries query values inline; they are hidden here, \
                 use a {{token}} placeholder to keep secrets out of the config"
            ));
        }
        suppliers.push(SourceEntry {
            id,
            kind: redacted.kind,
            enabled: redacted.enabled,
            feed_url: redacted.feed_url,
            category_feed_url: redacted.category_feed_url,
            token_configured,
        });
    }

    let data = SourcesResponseData {
        timeout_ms: config.timeout_ms,
        keyword_rules: config.keyword_table().len(),
        suppliers,
    };

    let mut result = CommandResult::ok(serde_json::to_value(data)?);
    for warning in warnings {
        result = result.with_warning(warning);
    }
    Ok(result)
}
