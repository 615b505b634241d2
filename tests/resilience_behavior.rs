//! Behavior tests for failure handling: storage errors, error budgets,
//! and symbol-creation races.

use std::sync::Arc;
use std::time::Duration;

use wheelbook_core::SymbolHints;
use wheelbook_import::{ImportOutcome, ResolverOptions, SymbolResolver};
use wheelbook_tests::{config_for, pipeline_with_portfolio, ROBINHOOD_CSV};
use wheelbook_warehouse::MemoryStore;

#[tokio::test]
async fn when_storage_fails_for_one_ticker_then_other_trades_still_import() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    store.fail_trades_for("AAPL").await;

    let report = pipeline
        .import_text(ROBINHOOD_CSV, &config_for(portfolio_id))
        .await;

    assert_eq!(report.outcome, ImportOutcome::PartiallyCompleted);
    assert_eq!(report.successful, 1, "the TSLA trade goes through");
    assert_eq!(report.failed, 2, "both AAPL fills fail");
    assert!(report
        .errors
        .iter()
        .any(|error| error.code == "storage.create_trade"));

    let trades = store.trades().await;
    assert!(trades.iter().all(|stored| stored.trade.symbol == "TSLA"));
}

#[tokio::test]
async fn when_stop_on_first_error_is_set_then_the_import_halts_early() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    store.fail_trades_for("AAPL").await;

    let mut config = config_for(portfolio_id);
    config.stop_on_first_error = true;
    config.batch_size = 1;
    let report = pipeline.import_text(ROBINHOOD_CSV, &config).await;

    // The first sub-batch is the first AAPL fill; nothing after it runs.
    assert_eq!(report.successful, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn when_the_error_budget_is_exhausted_then_remaining_batches_are_abandoned() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    store.fail_trades_for("AAPL").await;

    let mut config = config_for(portfolio_id);
    config.max_errors = Some(0);
    config.batch_size = 1;
    let report = pipeline.import_text(ROBINHOOD_CSV, &config).await;

    assert!(report.failed >= 1);
    assert!(
        report.successful + report.failed < 3,
        "at least one record was never attempted"
    );
    assert_eq!(store.trade_count().await, report.successful);
}

#[tokio::test]
async fn recorded_failures_never_exceed_the_error_budget() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    store.fail_trades_for("AAPL").await;

    let mut csv = String::from(
        "Activity Date,Instrument,Description,Trans Code,Quantity,Price,Settle Date\n",
    );
    for day in 1..=5 {
        csv.push_str(&format!(
            "11/0{day}/2023,AAPL,AAPL 12/15/2023 Call $150.00,STO,1,$1.25,11/0{day}/2023\n"
        ));
    }

    let mut config = config_for(portfolio_id);
    config.batch_size = 1;
    config.max_errors = Some(2);
    let report = pipeline.import_text(&csv, &config).await;

    assert_eq!(report.failed, 2, "{}", report.message);
    assert!(
        report.successful + report.failed < 5,
        "remaining batches were abandoned"
    );
}

#[tokio::test]
async fn repeated_tickers_create_exactly_one_symbol_record() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let mut csv = String::from(
        "Activity Date,Instrument,Description,Trans Code,Quantity,Price,Settle Date\n",
    );
    for day in 1..=9 {
        csv.push_str(&format!(
            "11/0{day}/2023,AAPL,AAPL 12/15/2023 Call $150.00,STO,1,$1.25,11/0{day}/2023\n"
        ));
    }

    let report = pipeline.import_text(&csv, &config_for(portfolio_id)).await;

    assert_eq!(report.successful, 9, "{}", report.message);
    assert_eq!(store.create_calls("AAPL").await, 1);
    assert_eq!(store.symbol_count().await, 1);
}

#[tokio::test]
async fn concurrent_creation_of_one_ticker_is_guarded_not_duplicated() {
    let store = Arc::new(MemoryStore::new());
    store.set_symbol_create_delay(Duration::from_millis(50)).await;
    let resolver = Arc::new(SymbolResolver::new(
        store.clone(),
        ResolverOptions::default(),
    ));

    let racing = resolver.clone();
    let hints = SymbolHints::default();
    let (first, second) = tokio::join!(
        resolver.resolve("NVDA", &hints),
        async move {
            let hints = SymbolHints::default();
            tokio::time::sleep(Duration::from_millis(10)).await;
            racing.resolve("NVDA", &hints).await
        }
    );

    let winner = first.expect("first resolution succeeds");
    assert!(winner.created);
    assert_eq!(
        second.expect_err("second resolution fails fast").code(),
        "import.symbol_creation_in_flight"
    );
    assert_eq!(store.create_calls("NVDA").await, 1);
}

#[tokio::test]
async fn when_cancelled_during_symbol_resolution_then_no_trades_are_written() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;
    // Slow creations keep the session inside the resolution stage long
    // enough to cancel it from the outside.
    store.set_symbol_create_delay(Duration::from_millis(40)).await;
    let pipeline = Arc::new(pipeline);
    let registry = pipeline.registry().clone();

    let mut csv =
        String::from("Symbol,Date,Action,Quantity,Price,Strike,Expiration,Type\n");
    for n in 0..60 {
        csv.push_str(&format!(
            "TK{n:03},2023-11-01,sell_to_open,1,1.25,150,2023-12-15,call\n"
        ));
    }

    let worker = pipeline.clone();
    let config = config_for(portfolio_id);
    let session = tokio::spawn(async move { worker.import_text(&csv, &config).await });

    // Cancel through the registry as soon as the session appears.
    loop {
        if let Some(id) = registry.active_sessions().await.first().copied() {
            if let Some(tracker) = registry.get(id).await {
                tracker.cancel();
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let report = session.await.expect("session task");
    assert_eq!(report.outcome, ImportOutcome::Cancelled, "{}", report.message);
    assert!(report
        .errors
        .iter()
        .any(|error| error.code == "import.cancelled"));
    assert_eq!(store.trade_count().await, 0);
}

#[tokio::test]
async fn when_auto_create_is_disabled_then_unknown_tickers_fail_their_rows() {
    let (pipeline, store, portfolio_id) = pipeline_with_portfolio().await;

    let mut config = config_for(portfolio_id);
    config.resolver.auto_create = false;
    let report = pipeline.import_text(ROBINHOOD_CSV, &config).await;

    assert_eq!(report.outcome, ImportOutcome::Failed);
    assert_eq!(store.trade_count().await, 0);
    assert!(report
        .errors
        .iter()
        .any(|error| error.code == "resolve.needs_creation"));
}
