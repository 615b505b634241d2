mod brokers;
mod check;
mod import;
mod preview;

use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;

use wheelbook_import::parser::SourceEncoding;
use wheelbook_import::BrokerId;
use wheelbook_warehouse::{DuckDbStore, StoreConfig};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    match &cli.command {
        Command::Import(args) => import::run(cli, args).await,
        Command::Preview(args) => preview::run(cli, args),
        Command::Check(args) => check::run(cli, args),
        Command::Brokers => brokers::run(cli),
    }
}

fn open_store(cli: &Cli) -> Result<Arc<DuckDbStore>, CliError> {
    let store = DuckDbStore::open(StoreConfig::new(&cli.db))?;
    Ok(Arc::new(store))
}

fn parse_broker(raw: Option<&str>) -> Result<Option<BrokerId>, CliError> {
    match raw {
        None => Ok(None),
        Some(raw) => BrokerId::from_str(raw)
            .map(Some)
            .map_err(|_| {
                CliError::InvalidArgument(format!(
                    "unknown broker '{raw}' (expected one of: {})",
                    BrokerId::ALL.map(BrokerId::as_str).join(", ")
                ))
            }),
    }
}

const fn encoding(latin1: bool) -> SourceEncoding {
    if latin1 {
        SourceEncoding::Latin1
    } else {
        SourceEncoding::Utf8
    }
}
