//! Result rendering for the terminal.
//!
//! Two formats: `human` prints a short readable summary, `json` prints
//! the full report structure for scripting.

use serde::Serialize;

use wheelbook_import::parser::StructureReport;
use wheelbook_import::{ImportReport, PreviewReport};

use crate::cli::{Cli, OutputFormat};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct BrokerInfo {
    pub tag: &'static str,
    pub name: &'static str,
    pub required_columns: Vec<String>,
    pub fallback: bool,
}

fn render_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{text}");
    Ok(())
}

pub fn render_report(cli: &Cli, report: &ImportReport) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        return render_json(report, cli.pretty);
    }

    println!("session {}: {}", report.session_id, report.outcome);
    println!("  {}", report.message);
    if let Some(detection) = &report.detection {
        println!(
            "  detected {} (confidence {:.2}): {}",
            detection.broker, detection.confidence, detection.rationale
        );
    } else if let Some(broker) = report.broker {
        println!("  broker forced: {broker}");
    }
    println!(
        "  rows: {} total, {} imported, {} failed, {} skipped",
        report.total_rows, report.successful, report.failed, report.skipped
    );
    println!(
        "  duration: {} ms ({:.0} records/s)",
        report.summary.duration_ms, report.summary.average_rps
    );

    for group in &report.summary.error_groups {
        println!("  error x{}: {}", group.count, group.message);
    }
    if !report.warnings.is_empty() {
        println!("  {} warnings (use --format json for details)", report.warnings.len());
    }
    Ok(())
}

pub fn render_preview(cli: &Cli, report: &PreviewReport) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        return render_json(report, cli.pretty);
    }

    println!(
        "delimiter '{}', {} header columns, {} rows examined",
        report.delimiter,
        report.headers.len(),
        report.rows_examined
    );
    match &report.detection {
        Some(detection) => println!(
            "detected {} (confidence {:.2}): {}",
            detection.broker, detection.confidence, detection.rationale
        ),
        None => println!("broker forced, detection skipped"),
    }
    for trade in &report.sample_trades {
        println!(
            "  {} {} {} {} x{} @ {:.2} exp {}",
            trade.trade_date,
            trade.trade_action.as_str(),
            trade.symbol,
            trade.strike_price,
            trade.quantity,
            trade.premium,
            trade.expiration_date
        );
    }
    for reason in &report.skipped {
        println!("  skip: {reason}");
    }
    for issue in &report.issues {
        println!("  invalid: {}", issue.message);
    }
    Ok(())
}

pub fn render_structure(cli: &Cli, report: &StructureReport) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        return render_json(report, cli.pretty);
    }

    if report.ok {
        println!("structure looks importable");
    } else {
        println!("structural problems found:");
    }
    for issue in &report.issues {
        println!("  problem: {issue}");
    }
    for suggestion in &report.suggestions {
        println!("  hint: {suggestion}");
    }
    Ok(())
}

pub fn render_brokers(cli: &Cli, brokers: &[BrokerInfo]) -> Result<(), CliError> {
    if cli.format == OutputFormat::Json {
        return render_json(&brokers, cli.pretty);
    }

    for broker in brokers {
        let suffix = if broker.fallback { " (fallback)" } else { "" };
        println!("{} - {}{}", broker.tag, broker.name, suffix);
        println!("  required columns: {}", broker.required_columns.join(", "));
    }
    Ok(())
}
