mod cli;

use anyhow::Context;
use clap::Parser;
use explorer_core::{network, ExplorerClient};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&cli.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Command::Networks = cli.command {
        for (alias, domain) in network::known_networks() {
            println!("{alias:<14} {domain}");
        }
        return Ok(());
    }

    let client = ExplorerClient::from_config(cli.client_config())
        .with_context(|| format!("invalid network `{}`", cli.network))?;
    tracing::debug!(base_url = client.base_url(), "client ready");

    match &cli.command {
        Command::Networks => {}
        Command::Collections => print_json(&client.list_collections().context("listing collections")?)?,
        Command::Tables { collection } => print_json(
            &client
                .list_tables(collection)
                .with_context(|| format!("listing tables of {collection}"))?,
        )?,
        Command::Schema { collection, table, raw } => {
            if *raw {
                print_json(&client.get_schema(collection, table).context("fetching schema")?)?;
            } else {
                let fields = client.get_schema_fields(collection, table).context("fetching schema")?;
                for field in fields {
                    println!("{:<32} {:<20} {}", field.field, field.field_type, field.sql_type);
                }
            }
        }
        Command::Query(args) => {
            let options = args.options()?;
            let result = if args.poll {
                client.query_with_polling(&args.collection, &args.table, &options, &args.poll_config())
            } else {
                client.query(&args.collection, &args.table, &options)
            }
            .with_context(|| format!("querying {}", args.table))?;
            print_json(&result)?;
        }
        Command::Count {
            collection,
            table,
            filters,
        } => {
            let count = client
                .count(collection, table, &filters.to_filters()?)
                .with_context(|| format!("counting rows of {table}"))?;
            println!("{count}");
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
