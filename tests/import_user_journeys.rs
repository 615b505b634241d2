//! Behavior tests for the end-to-end import pipeline.
//!
//! These verify WHAT a user of the importer observes: which trades land
//! in the store, what the report says, and how bad input is surfaced.

use uuid::Uuid;

use wheelbook_import::{BrokerId, ImportOutcome, ImportPipeline};
use wheelbook_tests::{config_for, pipeline_with_portfolio, ROBINHOOD_CSV, SCHWAB_CSV};
use wheelbook_warehouse::MemoryStore;

const GENERIC_CSV: &str = "\
Symbol,Date,Action,Quantity,Price,Strike,Expiration,Type
AAPL,2023-11-01,sell_to_open,2,1.25,150,2023-12-15,call
TSLA,2023-11-02,sell_to_open,1,5.10,0,2024-01-19,put
";

#[tokio::test]
async fn when_importing_a_robinhood_export_then_option_trades_are_persisted() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let report = pipeline
        .import_text(ROBINHOOD_CSV, &config_for(portfolio_id))
        .await;

    assert_eq!(report.outcome, ImportOutcome::Completed, "{}", report.message);
    assert_eq!(report.broker, Some(BrokerId::Robinhood));
    assert_eq!(report.successful, 3);
    assert_eq!(report.skipped, 1, "the ACH row is not an error");
    assert_eq!(report.failed, 0);
    assert_eq!(store.trade_count().await, 3);

    // Two distinct tickers means exactly two symbol records.
    assert_eq!(store.symbol_count().await, 2);

    let detection = report.detection.expect("detection ran");
    assert!(detection.confidence >= 0.7, "got {}", detection.confidence);
}

#[tokio::test]
async fn when_detection_runs_then_the_report_explains_the_match() {
    let (pipeline, _store, portfolio_id) = pipeline_with_portfolio().await;

    let report = pipeline
        .import_text(ROBINHOOD_CSV, &config_for(portfolio_id))
        .await;

    let detection = report.detection.expect("detection ran");
    assert!(detection.rationale.contains("required columns present"));
    assert!(!detection.columns_found.is_empty());
}

#[tokio::test]
async fn when_a_strike_is_zero_then_the_record_fails_and_is_not_persisted() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let report = pipeline
        .import_text(GENERIC_CSV, &config_for(portfolio_id))
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartiallyCompleted);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 1);
    assert!(report
        .errors
        .iter()
        .any(|error| error.message == "Strike price must be positive"));

    let trades = store.trades().await;
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].trade.symbol, "AAPL");
}

#[tokio::test]
async fn when_expiration_precedes_trade_date_then_it_warns_but_still_imports() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    let csv = "\
Symbol,Date,Action,Quantity,Price,Strike,Expiration,Type
AAPL,2024-01-05,sell_to_open,1,1.00,150,2023-12-15,call
";

    let report = pipeline.import_text(csv, &config_for(portfolio_id)).await;

    assert_eq!(report.outcome, ImportOutcome::Completed, "{}", report.message);
    assert_eq!(store.trade_count().await, 1);
    assert!(report
        .warnings
        .iter()
        .any(|warning| warning.message == "Expiration date is before trade date"));
}

#[tokio::test]
async fn when_strict_mode_is_on_then_warnings_block_the_record() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    let csv = "\
Symbol,Date,Action,Quantity,Price,Strike,Expiration,Type
AAPL,2024-01-05,sell_to_open,1,1.00,150,2023-12-15,call
";

    let mut config = config_for(portfolio_id);
    config.validation.strict = true;
    let report = pipeline.import_text(csv, &config).await;

    assert_eq!(report.outcome, ImportOutcome::Failed);
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn when_invalid_records_may_not_be_skipped_then_the_whole_import_is_rejected() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let mut config = config_for(portfolio_id);
    config.skip_invalid_records = false;
    let report = pipeline.import_text(GENERIC_CSV, &config).await;

    assert_eq!(report.outcome, ImportOutcome::Failed);
    assert!(
        report
            .errors
            .iter()
            .any(|error| error.code == "import.validation_rejected"),
        "{}",
        report.message
    );
    assert_eq!(store.trade_count().await, 0, "the valid record is held back too");
}

#[tokio::test]
async fn processed_records_always_partition_into_success_failure_skip() {
    let (pipeline, _store, portfolio_id) = pipeline_with_portfolio().await;

    for csv in [ROBINHOOD_CSV, SCHWAB_CSV, GENERIC_CSV] {
        let report = pipeline.import_text(csv, &config_for(portfolio_id)).await;
        assert_eq!(
            report.summary.processed,
            report.successful + report.failed + report.skipped,
            "{csv}"
        );
    }
}

#[tokio::test]
async fn when_the_portfolio_is_missing_then_nothing_is_written() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let pipeline = ImportPipeline::new(store.clone());

    let report = pipeline
        .import_text(ROBINHOOD_CSV, &config_for(Uuid::new_v4()))
        .await;

    assert_eq!(report.outcome, ImportOutcome::Failed);
    assert!(report.message.contains("does not exist"));
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn when_no_broker_matches_then_the_import_fails_with_a_clear_message() {
    let (pipeline, _store, portfolio_id) = pipeline_with_portfolio().await;
    let csv = "foo,bar,baz\n1,2,3\n";

    let report = pipeline.import_text(csv, &config_for(portfolio_id)).await;

    assert_eq!(report.outcome, ImportOutcome::Failed);
    assert!(report.message.contains("no registered broker format"));
}

#[tokio::test]
async fn when_a_broker_is_forced_then_detection_is_bypassed() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let mut config = config_for(portfolio_id);
    config.broker = Some(BrokerId::Generic);
    let report = pipeline.import_text(SCHWAB_CSV, &config).await;

    assert_eq!(report.broker, Some(BrokerId::Generic));
    assert!(report.detection.is_none());
    // The generic adapter cannot find option columns in a Schwab sheet,
    // so every row is a clean skip.
    assert_eq!(report.outcome, ImportOutcome::Completed);
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn when_previewing_then_no_writes_reach_the_store() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let preview = pipeline
        .preview(ROBINHOOD_CSV, &config_for(portfolio_id))
        .expect("preview");

    assert_eq!(preview.sample_trades.len(), 3);
    assert_eq!(preview.skipped.len(), 1);
    assert_eq!(preview.detection.expect("detection").broker, BrokerId::Robinhood);
    assert_eq!(store.trade_count().await, 0);
    assert_eq!(store.symbol_count().await, 0);
}

#[tokio::test]
async fn when_an_import_finishes_then_an_audit_row_is_recorded() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let report = pipeline
        .import_text(ROBINHOOD_CSV, &config_for(portfolio_id))
        .await;

    let log = store.import_log().await;
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].session_id, report.session_id);
    assert_eq!(log[0].outcome, "completed");
    assert_eq!(log[0].successful, 3);
    assert_eq!(log[0].broker, "robinhood");
}
