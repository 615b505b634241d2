//! DuckDB-backed [`TradeStore`] implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;
use async_trait::async_trait;
use uuid::Uuid;

use wheelbook_core::{NormalizedTrade, SymbolHints};

use crate::migrations;
use crate::{escape_sql_string, sql_option_string, ImportLogEntry, StoreError, SymbolRecord, TradeStore};

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
}

impl StoreConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

/// File-backed store. DuckDB connections are not `Sync`, so a single
/// connection sits behind a mutex and every call runs on the blocking pool.
#[derive(Clone)]
pub struct DuckDbStore {
    connection: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl DuckDbStore {
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let connection = Connection::open(&config.db_path)
            .map_err(|error| StoreError::Connection(error.to_string()))?;
        migrations::apply_migrations(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            db_path: config.db_path,
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory()
            .map_err(|error| StoreError::Connection(error.to_string()))?;
        migrations::apply_migrations(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    async fn with_connection<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let connection = Arc::clone(&self.connection);
        tokio::task::spawn_blocking(move || {
            let guard = connection
                .lock()
                .expect("duckdb connection mutex poisoned");
            op(&guard)
        })
        .await
        .map_err(|error| StoreError::Connection(format!("blocking task failed: {error}")))?
    }
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn query_symbol(connection: &Connection, ticker: &str) -> Result<Option<SymbolRecord>, StoreError> {
    let sql = format!(
        "SELECT CAST(id AS TEXT), ticker, name, exchange FROM symbols WHERE ticker = '{}'",
        escape_sql_string(ticker)
    );

    let row = connection.query_row(sql.as_str(), [], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
            row.get::<_, Option<String>>(3)?,
        ))
    });

    match row {
        Ok((id, ticker, name, exchange)) => {
            let id = Uuid::parse_str(&id)
                .map_err(|error| StoreError::Query(format!("malformed symbol id: {error}")))?;
            Ok(Some(SymbolRecord {
                id,
                ticker,
                name,
                exchange,
            }))
        }
        Err(::duckdb::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

#[async_trait]
impl TradeStore for DuckDbStore {
    async fn portfolio_exists(&self, portfolio_id: Uuid) -> Result<bool, StoreError> {
        self.with_connection(move |connection| {
            let sql = format!(
                "SELECT COUNT(*) FROM portfolios WHERE id = '{portfolio_id}'"
            );
            let count: i64 = connection.query_row(sql.as_str(), [], |row| row.get(0))?;
            Ok(count > 0)
        })
        .await
    }

    async fn ensure_portfolio(&self, portfolio_id: Uuid, name: &str) -> Result<(), StoreError> {
        let name = name.to_owned();
        self.with_connection(move |connection| {
            let sql = format!(
                "INSERT OR IGNORE INTO portfolios (id, name) VALUES ('{portfolio_id}', '{}')",
                escape_sql_string(&name)
            );
            connection.execute_batch(sql.as_str())?;
            Ok(())
        })
        .await
    }

    async fn find_symbol(&self, ticker: &str) -> Result<Option<SymbolRecord>, StoreError> {
        let ticker = ticker.to_owned();
        self.with_connection(move |connection| query_symbol(connection, &ticker))
            .await
    }

    async fn create_symbol(
        &self,
        ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolRecord, StoreError> {
        let ticker = ticker.to_owned();
        let hints = hints.clone();
        self.with_connection(move |connection| {
            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<SymbolRecord, StoreError> {
                if let Some(existing) = query_symbol(connection, &ticker)? {
                    return Err(StoreError::Conflict(format!(
                        "symbol '{}' already exists with id {}",
                        existing.ticker, existing.id
                    )));
                }

                let record = SymbolRecord {
                    id: Uuid::new_v4(),
                    ticker: ticker.clone(),
                    name: hints.name.clone(),
                    exchange: hints.exchange.clone(),
                };
                let sql = format!(
                    "INSERT INTO symbols (id, ticker, name, exchange) VALUES ('{}', '{}', {}, {})",
                    record.id,
                    escape_sql_string(&record.ticker),
                    sql_option_string(record.name.as_deref()),
                    sql_option_string(record.exchange.as_deref()),
                );
                connection.execute_batch(sql.as_str())?;
                Ok(record)
            })();
            finalize_transaction(connection, result)
        })
        .await
    }

    async fn update_symbol_hints(&self, id: Uuid, hints: &SymbolHints) -> Result<(), StoreError> {
        let hints = hints.clone();
        self.with_connection(move |connection| {
            let sql = format!(
                "UPDATE symbols SET name = COALESCE({}, name), exchange = COALESCE({}, exchange), \
                 updated_at = CURRENT_TIMESTAMP WHERE id = '{id}'",
                sql_option_string(hints.name.as_deref()),
                sql_option_string(hints.exchange.as_deref()),
            );
            let updated = connection.execute(sql.as_str(), [])?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("symbol {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn create_trade(
        &self,
        portfolio_id: Uuid,
        symbol_id: Uuid,
        trade: &NormalizedTrade,
    ) -> Result<Uuid, StoreError> {
        let trade = trade.clone();
        self.with_connection(move |connection| {
            let trade_id = Uuid::new_v4();
            let sql = format!(
                "INSERT INTO trades (id, portfolio_id, symbol_id, option_type, strike_price, \
                 expiration_date, trade_action, quantity, premium, commission, fees, trade_date, notes) \
                 VALUES ('{trade_id}', '{portfolio_id}', '{symbol_id}', '{}', {}, DATE '{}', '{}', {}, {}, {}, {}, DATE '{}', {})",
                trade.option_type.as_str(),
                trade.strike_price,
                trade.expiration_date,
                trade.trade_action.as_str(),
                trade.quantity,
                trade.premium,
                trade.commission,
                trade.fees,
                trade.trade_date,
                sql_option_string(trade.notes.as_deref()),
            );
            connection.execute_batch(sql.as_str())?;
            Ok(trade_id)
        })
        .await
    }

    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), StoreError> {
        let entry = entry.clone();
        self.with_connection(move |connection| {
            let sql = format!(
                "INSERT INTO import_log (session_id, portfolio_id, broker, outcome, total_rows, \
                 successful, failed, skipped, duration_ms, message) \
                 VALUES ('{}', '{}', '{}', '{}', {}, {}, {}, {}, {}, '{}')",
                entry.session_id,
                entry.portfolio_id,
                escape_sql_string(&entry.broker),
                escape_sql_string(&entry.outcome),
                entry.total_rows,
                entry.successful,
                entry.failed,
                entry.skipped,
                entry.duration_ms,
                escape_sql_string(&entry.message),
            );
            connection.execute_batch(sql.as_str())?;
            Ok(())
        })
        .await
    }
}
