use std::process::ExitCode;

use tracing::info;

use wheelbook_import::{ImportConfig, ImportOutcome, ImportPipeline};
use wheelbook_warehouse::TradeStore;

use crate::cli::{Cli, ImportArgs};
use crate::error::CliError;
use crate::output;

pub async fn run(cli: &Cli, args: &ImportArgs) -> Result<ExitCode, CliError> {
    let broker = super::parse_broker(args.broker.as_deref())?;
    let delimiter = parse_delimiter(args.delimiter)?;

    let store = super::open_store(cli)?;
    if args.create_portfolio {
        store
            .ensure_portfolio(args.portfolio, "imported portfolio")
            .await?;
    }

    let mut config = ImportConfig::new(args.portfolio);
    config.broker = broker;
    config.delimiter = delimiter;
    config.encoding = super::encoding(args.latin1);
    config.validation.strict = args.strict;
    config.skip_invalid_records = !args.no_skip_invalid;
    config.stop_on_first_error = args.stop_on_first_error;
    config.max_errors = args.max_errors;
    config.batch_size = args.batch_size;
    config.resolver.auto_create = !args.no_auto_create;

    info!(file = %args.file.display(), portfolio = %args.portfolio, "starting import");
    let pipeline = ImportPipeline::new(store);
    let report = pipeline.import_file(&args.file, &config).await;

    output::render_report(cli, &report)?;

    Ok(match report.outcome {
        ImportOutcome::Completed => ExitCode::SUCCESS,
        ImportOutcome::PartiallyCompleted | ImportOutcome::Failed => ExitCode::from(3),
        ImportOutcome::Cancelled => ExitCode::from(6),
    })
}

pub(super) fn parse_delimiter(raw: Option<char>) -> Result<Option<u8>, CliError> {
    match raw {
        None => Ok(None),
        Some(ch) if ch.is_ascii() => Ok(Some(ch as u8)),
        Some(ch) => Err(CliError::InvalidArgument(format!(
            "delimiter '{ch}' is not a single-byte character"
        ))),
    }
}
