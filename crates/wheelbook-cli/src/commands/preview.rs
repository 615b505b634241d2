use std::process::ExitCode;
use std::sync::Arc;

use wheelbook_import::{parser, ImportConfig, ImportPipeline};
use wheelbook_warehouse::MemoryStore;

use crate::cli::{Cli, PreviewArgs};
use crate::error::CliError;
use crate::output;

/// Preview never touches the warehouse; the pipeline is given a throwaway
/// in-memory store purely to satisfy its constructor.
pub fn run(cli: &Cli, args: &PreviewArgs) -> Result<ExitCode, CliError> {
    let broker = super::parse_broker(args.broker.as_deref())?;
    let delimiter = super::import::parse_delimiter(args.delimiter)?;

    let text = parser::read_file(&args.file, super::encoding(args.latin1))?;

    let mut config = ImportConfig::new(uuid::Uuid::nil());
    config.broker = broker;
    config.delimiter = delimiter;

    let pipeline = ImportPipeline::new(Arc::new(MemoryStore::new()));
    let report = pipeline.preview(&text, &config)?;

    output::render_preview(cli, &report)?;
    Ok(ExitCode::SUCCESS)
}
