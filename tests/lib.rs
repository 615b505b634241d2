//! Shared fixtures for the wheelbook behavior tests.

use std::sync::Arc;

use uuid::Uuid;

use wheelbook_import::{ImportConfig, ImportPipeline};
use wheelbook_warehouse::{MemoryStore, TradeStore};

/// A small Robinhood activity export: two sell-to-open fills on distinct
/// symbols, one buy-to-close, and one cash row that must be skipped.
pub const ROBINHOOD_CSV: &str = "\
Activity Date,Process Date,Settle Date,Instrument,Description,Trans Code,Quantity,Price,Amount
11/01/2023,11/01/2023,11/02/2023,AAPL,AAPL 12/15/2023 Call $150.00,STO,2,$1.25,$250.00
11/02/2023,11/02/2023,11/03/2023,TSLA,TSLA 1/19/2024 Put $200.00,STO,1,$5.10,$510.00
11/20/2023,11/20/2023,11/21/2023,AAPL,AAPL 12/15/2023 Call $150.00,BTC,2,$0.40,($80.00)
11/30/2023,11/30/2023,11/30/2023,,ACH Deposit,ACH,,,$1000.00
";

/// Schwab export with one valid option fill and one equity fill.
pub const SCHWAB_CSV: &str = "\
Date,Action,Symbol,Description,Quantity,Price,Fees & Comm,Amount
11/01/2023,Sell to Open,AAPL 12/15/2023 150.00 C,CALL APPLE INC,2,$1.25,$1.30,$248.70
11/03/2023,Buy,MSFT,MICROSOFT CORP,10,$370.00,$0.00,($3700.00)
";

/// Build a pipeline over a fresh in-memory store with the portfolio
/// already created.
pub async fn pipeline_with_portfolio() -> (ImportPipeline, Arc<MemoryStore>, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let portfolio_id = Uuid::new_v4();
    store
        .ensure_portfolio(portfolio_id, "wheel journal")
        .await
        .expect("portfolio setup");
    let pipeline = ImportPipeline::new(store.clone());
    (pipeline, store, portfolio_id)
}

pub fn config_for(portfolio_id: Uuid) -> ImportConfig {
    ImportConfig::new(portfolio_id)
}
