//! In-memory [`TradeStore`] used by behavior tests and dry runs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use wheelbook_core::{NormalizedTrade, SymbolHints};

use crate::{ImportLogEntry, StoreError, SymbolRecord, TradeStore};

/// One persisted trade, kept for inspection by tests.
#[derive(Debug, Clone)]
pub struct StoredTrade {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub symbol_id: Uuid,
    pub trade: NormalizedTrade,
}

#[derive(Debug, Default)]
struct MemoryInner {
    portfolios: HashMap<Uuid, String>,
    symbols: HashMap<String, SymbolRecord>,
    trades: Vec<StoredTrade>,
    import_log: Vec<ImportLogEntry>,
    symbol_create_calls: HashMap<String, usize>,
    fail_trade_symbols: HashSet<String>,
    symbol_create_delay: Option<Duration>,
}

/// In-memory store with injectable latency and failure for tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create_trade` fail for trades on the given ticker.
    pub async fn fail_trades_for(&self, ticker: &str) {
        let mut inner = self.inner.lock().await;
        inner.fail_trade_symbols.insert(ticker.to_owned());
    }

    /// Delay symbol creation to widen the window for concurrency tests.
    pub async fn set_symbol_create_delay(&self, delay: Duration) {
        let mut inner = self.inner.lock().await;
        inner.symbol_create_delay = Some(delay);
    }

    pub async fn symbol_count(&self) -> usize {
        self.inner.lock().await.symbols.len()
    }

    pub async fn trade_count(&self) -> usize {
        self.inner.lock().await.trades.len()
    }

    pub async fn trades(&self) -> Vec<StoredTrade> {
        self.inner.lock().await.trades.clone()
    }

    pub async fn import_log(&self) -> Vec<ImportLogEntry> {
        self.inner.lock().await.import_log.clone()
    }

    /// Number of times `create_symbol` was invoked for a ticker.
    pub async fn create_calls(&self, ticker: &str) -> usize {
        self.inner
            .lock()
            .await
            .symbol_create_calls
            .get(ticker)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TradeStore for MemoryStore {
    async fn portfolio_exists(&self, portfolio_id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.portfolios.contains_key(&portfolio_id))
    }

    async fn ensure_portfolio(&self, portfolio_id: Uuid, name: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner
            .portfolios
            .entry(portfolio_id)
            .or_insert_with(|| name.to_owned());
        Ok(())
    }

    async fn find_symbol(&self, ticker: &str) -> Result<Option<SymbolRecord>, StoreError> {
        Ok(self.inner.lock().await.symbols.get(ticker).cloned())
    }

    async fn create_symbol(
        &self,
        ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolRecord, StoreError> {
        let delay = {
            let mut inner = self.inner.lock().await;
            *inner
                .symbol_create_calls
                .entry(ticker.to_owned())
                .or_insert(0) += 1;
            inner.symbol_create_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().await;
        if let Some(existing) = inner.symbols.get(ticker) {
            return Err(StoreError::Conflict(format!(
                "symbol '{}' already exists with id {}",
                existing.ticker, existing.id
            )));
        }

        let record = SymbolRecord {
            id: Uuid::new_v4(),
            ticker: ticker.to_owned(),
            name: hints.name.clone(),
            exchange: hints.exchange.clone(),
        };
        inner.symbols.insert(ticker.to_owned(), record.clone());
        Ok(record)
    }

    async fn update_symbol_hints(&self, id: Uuid, hints: &SymbolHints) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let record = inner
            .symbols
            .values_mut()
            .find(|record| record.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("symbol {id}")))?;

        if hints.name.is_some() {
            record.name.clone_from(&hints.name);
        }
        if hints.exchange.is_some() {
            record.exchange.clone_from(&hints.exchange);
        }
        Ok(())
    }

    async fn create_trade(
        &self,
        portfolio_id: Uuid,
        symbol_id: Uuid,
        trade: &NormalizedTrade,
    ) -> Result<Uuid, StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.fail_trade_symbols.contains(&trade.symbol) {
            return Err(StoreError::Query(format!(
                "injected failure for symbol '{}'",
                trade.symbol
            )));
        }

        let id = Uuid::new_v4();
        inner.trades.push(StoredTrade {
            id,
            portfolio_id,
            symbol_id,
            trade: trade.clone(),
        });
        Ok(id)
    }

    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), StoreError> {
        self.inner.lock().await.import_log.push(entry.clone());
        Ok(())
    }
}
