//! Batch import orchestration.
//!
//! The pipeline runs one import session end to end: parse, detect the
//! broker format, adapt rows, validate, resolve symbols, persist in
//! bounded concurrent sub-batches, then write the audit row. Stage
//! failures are folded into the report; [`ImportPipeline::import_text`]
//! and [`ImportPipeline::import_file`] never return `Err` — a fatal
//! error produces a failed report instead.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use wheelbook_core::{NormalizedTrade, SymbolHints};
use wheelbook_warehouse::{ImportLogEntry, TradeStore};

use crate::adapters::{BrokerAdapter, RowOutcome};
use crate::broker::BrokerId;
use crate::classify::{BrokerDetection, FormatClassifier};
use crate::config::ImportConfig;
use crate::error::{ImportError, RecordIssue};
use crate::parser::{self, ParsedTable};
use crate::progress::{ImportStatus, ImportSummary, ProgressRegistry, ProgressTracker};
use crate::resolve::SymbolResolver;
use crate::validate;

/// Rows adapted in the side-effect-free preview.
const PREVIEW_ROWS: usize = 10;

/// Terminal disposition of an import session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Every processed record either persisted or was skipped.
    Completed,
    /// Some records persisted, some failed.
    PartiallyCompleted,
    /// Nothing persisted.
    Failed,
    Cancelled,
}

impl ImportOutcome {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::PartiallyCompleted => "partially_completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ImportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full session report returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    pub session_id: Uuid,
    pub outcome: ImportOutcome,
    pub message: String,
    pub broker: Option<BrokerId>,
    /// Present when the broker was detected rather than forced.
    pub detection: Option<BrokerDetection>,
    pub total_rows: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<RecordIssue>,
    pub warnings: Vec<RecordIssue>,
    pub summary: ImportSummary,
}

/// Side-effect-free dry run over the head of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    pub headers: Vec<String>,
    pub delimiter: char,
    pub detection: Option<BrokerDetection>,
    /// Every adapter's score, for diagnostics.
    pub scores: Vec<BrokerDetection>,
    pub rows_examined: usize,
    pub sample_trades: Vec<NormalizedTrade>,
    pub skipped: Vec<String>,
    pub issues: Vec<RecordIssue>,
}

/// Orchestrates import sessions against a [`TradeStore`].
pub struct ImportPipeline {
    store: Arc<dyn TradeStore>,
    classifier: FormatClassifier,
    registry: Arc<ProgressRegistry>,
}

impl ImportPipeline {
    pub fn new(store: Arc<dyn TradeStore>) -> Self {
        Self::with_registry(store, Arc::new(ProgressRegistry::new()))
    }

    pub fn with_registry(store: Arc<dyn TradeStore>, registry: Arc<ProgressRegistry>) -> Self {
        Self {
            store,
            classifier: FormatClassifier::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ProgressRegistry> {
        &self.registry
    }

    /// Parse and adapt the first rows without touching the store.
    pub fn preview(&self, text: &str, config: &ImportConfig) -> Result<PreviewReport, ImportError> {
        let table = parser::preview(text, config.delimiter, PREVIEW_ROWS)?;
        let scores = self.classifier.score_all(&table.headers);
        let (adapter, detection) = self.select_adapter(config, &table)?;

        let mut sample_trades = Vec::new();
        let mut skipped = Vec::new();
        let mut issues = Vec::new();
        for (index, row) in table.rows.iter().enumerate() {
            match adapter.adapt_row(row) {
                RowOutcome::Trade(trade) => sample_trades.push(*trade),
                RowOutcome::Skip { reason } => skipped.push(reason),
                RowOutcome::Invalid { errors } => {
                    issues.extend(errors.into_iter().map(|error| {
                        RecordIssue::new(
                            Some(index),
                            Some(error.field.to_owned()),
                            format!("adapt.{}", error.code),
                            error.message,
                        )
                    }));
                }
            }
        }

        Ok(PreviewReport {
            headers: table.headers,
            delimiter: table.delimiter as char,
            detection,
            scores,
            rows_examined: table.rows.len(),
            sample_trades,
            skipped,
            issues,
        })
    }

    /// Run a full import session over CSV text. Never returns `Err`; a
    /// fatal stage error yields a failed report.
    pub async fn import_text(&self, text: &str, config: &ImportConfig) -> ImportReport {
        let session_id = Uuid::new_v4();
        let tracker = Arc::new(ProgressTracker::with_emit_interval(
            session_id,
            Duration::from_millis(config.progress_interval_ms.max(1)),
        ));
        self.registry.register(tracker.clone()).await;

        let report = match self.run(text, config, &tracker).await {
            Ok(report) => report,
            Err(error) => self.failed_report(&tracker, config, &error).await,
        };

        self.registry.remove(session_id).await;
        info!(
            session = %session_id,
            outcome = %report.outcome,
            successful = report.successful,
            failed = report.failed,
            skipped = report.skipped,
            "import session finished"
        );
        report
    }

    /// Read a CSV file and run a full import session over it.
    pub async fn import_file(&self, path: &Path, config: &ImportConfig) -> ImportReport {
        match parser::read_file(path, config.encoding) {
            Ok(text) => self.import_text(&text, config).await,
            Err(error) => {
                let tracker = ProgressTracker::new(Uuid::new_v4());
                self.failed_report(&tracker, config, &error).await
            }
        }
    }

    async fn run(
        &self,
        text: &str,
        config: &ImportConfig,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<ImportReport, ImportError> {
        tracker.set_status(ImportStatus::Preparing).await;
        if !self.store.portfolio_exists(config.portfolio_id).await? {
            return Err(ImportError::portfolio_not_found(config.portfolio_id));
        }

        tracker.set_status(ImportStatus::Parsing).await;
        let table = parser::parse_text(text, config.delimiter)?;
        tracker.set_total(table.rows.len()).await;

        let mut warnings: Vec<RecordIssue> = table
            .tolerable_issues
            .iter()
            .map(|issue| {
                RecordIssue::new(
                    None,
                    None,
                    "parse.ragged_row",
                    format!("line {}: {}", issue.line, issue.message),
                )
            })
            .collect();

        let (adapter, detection) = self.select_adapter(config, &table)?;
        let broker = adapter.broker();
        info!(broker = %broker, rows = table.rows.len(), "adapting rows");

        // Adapt every row; skips and invalid rows are terminal here.
        let mut errors: Vec<RecordIssue> = Vec::new();
        let mut adapted: Vec<(usize, NormalizedTrade)> = Vec::new();
        for (index, row) in table.rows.iter().enumerate() {
            match adapter.adapt_row(row) {
                RowOutcome::Trade(trade) => adapted.push((index, *trade)),
                RowOutcome::Skip { reason } => {
                    tracker.record_skip(1).await;
                    warnings.push(RecordIssue::new(
                        Some(index),
                        None,
                        "adapt.skipped",
                        reason,
                    ));
                }
                RowOutcome::Invalid {
                    errors: field_errors,
                } => {
                    let issues: Vec<RecordIssue> = field_errors
                        .into_iter()
                        .map(|error| {
                            RecordIssue::new(
                                Some(index),
                                Some(error.field.to_owned()),
                                format!("adapt.{}", error.code),
                                error.message,
                            )
                        })
                        .collect();
                    if let Some(first) = issues.first() {
                        tracker.record_failure(first.clone()).await;
                    }
                    errors.extend(issues);
                }
            }
        }

        tracker.set_status(ImportStatus::Validating).await;
        let indices: Vec<usize> = adapted.iter().map(|(index, _)| *index).collect();
        let mut trades: Vec<NormalizedTrade> =
            adapted.into_iter().map(|(_, trade)| trade).collect();
        let batch = validate::validate_batch(&mut trades, &config.validation);

        if batch.invalid_records > 0 && !config.skip_invalid_records {
            return Err(ImportError::validation_rejected(format!(
                "{} of {} records failed validation and skip_invalid_records is disabled",
                batch.invalid_records, batch.total_records
            )));
        }

        let mut importable: Vec<(usize, NormalizedTrade)> = Vec::new();
        for (position, outcome) in batch.outcomes.iter().enumerate() {
            let row_index = indices[position];
            for warning in &outcome.warnings {
                let issue = retag(warning, row_index);
                tracker.record_warning(issue.clone()).await;
                warnings.push(issue);
            }
            if outcome.is_valid {
                importable.push((row_index, trades[position].clone()));
            } else {
                if let Some(first) = outcome.errors.first() {
                    tracker.record_failure(retag(first, row_index)).await;
                }
                errors.extend(outcome.errors.iter().map(|error| retag(error, row_index)));
            }
        }

        tracker.set_status(ImportStatus::Importing).await;
        let resolver = SymbolResolver::new(self.store.clone(), config.resolver.clone());
        let hints = collect_hints(importable.iter().map(|(_, trade)| trade));
        let resolution = resolver
            .resolve_batch_with_cancel(&hints, tracker.cancel_flag())
            .await;
        if resolution.cancelled {
            return Err(ImportError::cancelled());
        }

        let mut unresolved: HashMap<String, RecordIssue> = HashMap::new();
        for (ticker, error) in &resolution.failures {
            unresolved.insert(
                ticker.clone(),
                RecordIssue::new(None, Some("symbol".to_owned()), error.code(), error.message()),
            );
        }
        for ticker in &resolution.missing {
            unresolved.insert(
                ticker.clone(),
                RecordIssue::new(
                    None,
                    Some("symbol".to_owned()),
                    "resolve.needs_creation",
                    format!("ticker '{ticker}' has no symbol record and auto-create is disabled"),
                ),
            );
        }

        let mut persistable: Vec<(usize, Uuid, NormalizedTrade)> = Vec::new();
        for (row_index, trade) in importable {
            match resolution.resolved.get(&trade.symbol) {
                Some(record) => persistable.push((row_index, record.id, trade)),
                None => {
                    let issue = match unresolved.get(&trade.symbol) {
                        Some(template) => RecordIssue {
                            index: Some(row_index),
                            ..template.clone()
                        },
                        None => RecordIssue::new(
                            Some(row_index),
                            Some("symbol".to_owned()),
                            "resolve.failed",
                            format!("ticker '{}' did not resolve", trade.symbol),
                        ),
                    };
                    tracker.record_failure(issue.clone()).await;
                    errors.push(issue);
                }
            }
        }

        let cancelled = self
            .persist(&persistable, config, tracker, &mut errors)
            .await;

        let snapshot = tracker.snapshot().await;
        let (outcome, message) = if cancelled {
            (
                ImportOutcome::Cancelled,
                format!(
                    "import cancelled after {} of {} records",
                    snapshot.processed, snapshot.total
                ),
            )
        } else if snapshot.failed == 0 {
            (
                ImportOutcome::Completed,
                match snapshot.successful {
                    0 => String::from("no option trades found in the file"),
                    n => format!("imported {n} trades"),
                },
            )
        } else if snapshot.successful == 0 {
            (
                ImportOutcome::Failed,
                format!("all {} records failed", snapshot.failed),
            )
        } else {
            (
                ImportOutcome::PartiallyCompleted,
                format!(
                    "imported {} trades, {} failed",
                    snapshot.successful, snapshot.failed
                ),
            )
        };

        let status = match outcome {
            ImportOutcome::Completed | ImportOutcome::PartiallyCompleted => {
                ImportStatus::Completed
            }
            ImportOutcome::Failed => ImportStatus::Failed,
            ImportOutcome::Cancelled => ImportStatus::Cancelled,
        };
        let summary = tracker.finish(status).await;

        self.write_audit(config, &summary, broker.as_str(), outcome, &message)
            .await;

        Ok(ImportReport {
            session_id: tracker.session_id(),
            outcome,
            message,
            broker: Some(broker),
            detection,
            total_rows: summary.total,
            successful: summary.successful,
            failed: summary.failed,
            skipped: summary.skipped,
            errors,
            warnings,
            summary,
        })
    }

    /// Persist in bounded concurrent sub-batches. Returns true when the
    /// session was cancelled. Cancellation and the error budget are
    /// checked at sub-batch boundaries only.
    async fn persist(
        &self,
        persistable: &[(usize, Uuid, NormalizedTrade)],
        config: &ImportConfig,
        tracker: &Arc<ProgressTracker>,
        errors: &mut Vec<RecordIssue>,
    ) -> bool {
        let mut failures = 0usize;
        for chunk in persistable.chunks(config.effective_batch_size()) {
            if tracker.is_cancelled() {
                return true;
            }

            let results = join_all(chunk.iter().map(|(row_index, symbol_id, trade)| {
                let store = self.store.clone();
                let portfolio_id = config.portfolio_id;
                async move {
                    (
                        *row_index,
                        store.create_trade(portfolio_id, *symbol_id, trade).await,
                    )
                }
            }))
            .await;

            for (row_index, result) in results {
                match result {
                    Ok(_) => tracker.record_success(1).await,
                    Err(error) => {
                        failures += 1;
                        let issue = RecordIssue::new(
                            Some(row_index),
                            None,
                            "storage.create_trade",
                            error.to_string(),
                        );
                        tracker.record_failure(issue.clone()).await;
                        errors.push(issue);
                    }
                }
            }

            if failures > 0 && config.stop_on_first_error {
                warn!(failures, "stopping on first persistence error");
                break;
            }
            if let Some(max_errors) = config.max_errors {
                // The budget counts failures we tolerate; reaching it stops
                // further chunks. A budget of zero still lets clean chunks run.
                if failures > 0 && failures >= max_errors {
                    warn!(failures, max_errors, "error budget exhausted");
                    break;
                }
            }
        }
        false
    }

    fn select_adapter(
        &self,
        config: &ImportConfig,
        table: &ParsedTable,
    ) -> Result<(Arc<dyn BrokerAdapter>, Option<BrokerDetection>), ImportError> {
        match config.broker {
            Some(forced) => Ok((self.classifier.adapter(forced)?, None)),
            None => {
                let detection = self
                    .classifier
                    .detect(&table.headers)
                    .ok_or_else(ImportError::no_matching_broker)?;
                let adapter = self.classifier.adapter(detection.broker)?;
                Ok((adapter, Some(detection)))
            }
        }
    }

    async fn write_audit(
        &self,
        config: &ImportConfig,
        summary: &ImportSummary,
        broker: &str,
        outcome: ImportOutcome,
        message: &str,
    ) {
        let entry = ImportLogEntry {
            session_id: summary.session_id,
            portfolio_id: config.portfolio_id,
            broker: broker.to_owned(),
            outcome: outcome.as_str().to_owned(),
            total_rows: summary.total,
            successful: summary.successful,
            failed: summary.failed,
            skipped: summary.skipped,
            duration_ms: summary.duration_ms,
            message: message.to_owned(),
        };
        if let Err(error) = self.store.record_import(&entry).await {
            warn!(%error, "failed to write import audit row");
        }
    }

    async fn failed_report(
        &self,
        tracker: &ProgressTracker,
        config: &ImportConfig,
        error: &ImportError,
    ) -> ImportReport {
        let status = match error.kind() {
            crate::error::ImportErrorKind::Cancelled => ImportStatus::Cancelled,
            _ => ImportStatus::Failed,
        };
        let summary = tracker.finish(status).await;
        let outcome = match status {
            ImportStatus::Cancelled => ImportOutcome::Cancelled,
            _ => ImportOutcome::Failed,
        };

        self.write_audit(config, &summary, "unknown", outcome, error.message())
            .await;

        ImportReport {
            session_id: tracker.session_id(),
            outcome,
            message: error.to_string(),
            broker: None,
            detection: None,
            total_rows: summary.total,
            successful: summary.successful,
            failed: summary.failed,
            skipped: summary.skipped,
            errors: vec![RecordIssue::new(None, None, error.code(), error.message())],
            warnings: Vec::new(),
            summary,
        }
    }
}

fn retag(issue: &RecordIssue, row_index: usize) -> RecordIssue {
    RecordIssue {
        index: Some(row_index),
        ..issue.clone()
    }
}

/// Distinct tickers with hints merged first-non-empty in row order.
fn collect_hints<'a>(
    trades: impl Iterator<Item = &'a NormalizedTrade>,
) -> HashMap<String, SymbolHints> {
    let mut hints: HashMap<String, SymbolHints> = HashMap::new();
    for trade in trades {
        hints
            .entry(trade.symbol.clone())
            .and_modify(|existing| existing.merge(&trade.hints))
            .or_insert_with(|| trade.hints.clone());
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_merge_keeps_first_non_empty_value() {
        use time::macros::date;
        use wheelbook_core::{OptionType, TradeAction};

        let base = NormalizedTrade {
            symbol: "AAPL".to_owned(),
            option_type: OptionType::Call,
            strike_price: 150.0,
            expiration_date: date!(2023 - 12 - 15),
            trade_action: TradeAction::SellToOpen,
            quantity: 1,
            premium: 1.0,
            commission: 0.0,
            fees: 0.0,
            trade_date: date!(2023 - 11 - 01),
            notes: None,
            hints: SymbolHints {
                name: Some("Apple Inc".to_owned()),
                exchange: None,
            },
        };
        let mut second = base.clone();
        second.hints = SymbolHints {
            name: Some("APPLE INC COM".to_owned()),
            exchange: Some("NASDAQ".to_owned()),
        };

        let hints = collect_hints([&base, &second].into_iter());
        assert_eq!(hints.len(), 1);
        let merged = &hints["AAPL"];
        assert_eq!(merged.name.as_deref(), Some("Apple Inc"));
        assert_eq!(merged.exchange.as_deref(), Some("NASDAQ"));
    }
}
