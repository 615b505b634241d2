use std::process::ExitCode;

use wheelbook_import::parser;

use crate::cli::{CheckArgs, Cli};
use crate::error::CliError;
use crate::output;

pub fn run(cli: &Cli, args: &CheckArgs) -> Result<ExitCode, CliError> {
    let delimiter = super::import::parse_delimiter(args.delimiter)?;
    let text = parser::read_file(&args.file, super::encoding(args.latin1))?;
    let report = parser::check_structure(&text, delimiter);

    output::render_structure(cli, &report)?;
    Ok(if report.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(3)
    })
}
