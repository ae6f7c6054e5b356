use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use explorer_core::config::{ACCESS_TOKEN_ENV, NETWORK_ENV, TIMEOUT_ENV};
use explorer_core::{ClientConfig, Filters, OrderBy, PollConfig, QueryOptions, DEFAULT_LIMIT};
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "omics-explorer")]
#[command(about = "Browse and query Omics AI Explorer networks")]
pub struct Cli {
    /// Network alias (e.g. hifisolves), domain or base URL
    #[arg(short, long, env = NETWORK_ENV, default_value = "hifisolves", global = true)]
    pub network: String,

    /// Bearer token for protected collections
    #[arg(long, env = ACCESS_TOKEN_ENV, hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, env = TIMEOUT_ENV, default_value = "30", global = true)]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the built-in network aliases
    Networks,
    /// List collections on the network
    Collections,
    /// List tables in a collection
    Tables { collection: String },
    /// Show a table schema
    Schema {
        collection: String,
        table: String,
        /// Print the raw schema document instead of the field list
        #[arg(long)]
        raw: bool,
    },
    /// Query rows from a table
    Query(QueryArgs),
    /// Count rows matching filters
    Count {
        collection: String,
        table: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Equality filter as field=value; values that parse as JSON keep their type
    #[arg(short, long = "filter", value_parser = parse_pair)]
    pub filter: Vec<(String, Value)>,

    /// Full filter mapping as JSON: {"field": [{"operation", "value", "type"}]}
    #[arg(long, conflicts_with = "filter")]
    pub filters_json: Option<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    pub collection: String,
    pub table: String,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long, default_value_t = DEFAULT_LIMIT)]
    pub limit: u32,

    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Field to sort by
    #[arg(long)]
    pub order_by: Option<String>,

    /// Sort descending (with --order-by)
    #[arg(long, requires = "order_by")]
    pub desc: bool,

    /// Poll until an asynchronous query produces rows
    #[arg(long)]
    pub poll: bool,

    #[arg(long, default_value_t = 10)]
    pub max_polls: u32,

    /// Milliseconds between polls
    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.network).timeout(Duration::from_secs(self.timeout));
        config.access_token = self.token.clone().filter(|t| !t.is_empty());
        config
    }
}

impl FilterArgs {
    pub fn to_filters(&self) -> explorer_core::Result<Filters> {
        match &self.filters_json {
            Some(json) => json.parse(),
            None => Ok(Filters::equals(self.filter.iter().cloned())),
        }
    }
}

impl QueryArgs {
    pub fn options(&self) -> explorer_core::Result<QueryOptions> {
        let mut options = QueryOptions::new()
            .filters(self.filters.to_filters()?)
            .limit(self.limit)
            .offset(self.offset);
        if let Some(field) = &self.order_by {
            options = options.order_by(if self.desc {
                OrderBy::desc(field)
            } else {
                OrderBy::asc(field)
            });
        }
        Ok(options)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            max_polls: self.max_polls,
            interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// `field=value`, where `value` is read as JSON when it parses (numbers,
/// booleans, quoted strings) and as a plain string otherwise.
fn parse_pair(s: &str) -> Result<(String, Value), String> {
    let (field, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got `{s}`"))?;
    if field.trim().is_empty() {
        return Err(format!("missing field name in `{s}`"));
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Number(_) | Value::Bool(_) | Value::String(_))) => value,
        _ => Value::String(raw.to_string()),
    };
    Ok((field.trim().to_string(), value))
}
