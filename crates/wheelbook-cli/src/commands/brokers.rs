use std::process::ExitCode;

use wheelbook_import::{BrokerId, FormatClassifier};

use crate::cli::Cli;
use crate::error::CliError;
use crate::output;

pub fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let classifier = FormatClassifier::new();
    let brokers: Vec<output::BrokerInfo> = classifier
        .adapters()
        .iter()
        .map(|adapter| output::BrokerInfo {
            tag: adapter.broker().as_str(),
            name: adapter.broker().display_name(),
            required_columns: adapter
                .required_columns()
                .iter()
                .map(|column| (*column).to_owned())
                .collect(),
            fallback: adapter.broker() == BrokerId::Generic,
        })
        .collect();

    output::render_brokers(cli, &brokers)?;
    Ok(ExitCode::SUCCESS)
}
