//! Storage collaborator for the wheelbook import pipeline.
//!
//! The pipeline treats persistence as an opaque record store behind the
//! [`TradeStore`] trait: symbol lookup/create, trade create, a portfolio
//! existence precondition, and an import audit row. Two implementations are
//! provided:
//!
//! | Implementation | Description |
//! |----------------|-------------|
//! | [`DuckDbStore`] | DuckDB file-backed store used by the CLI |
//! | [`MemoryStore`] | In-memory store with failure/latency injection for tests |

pub mod duckdb_store;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use wheelbook_core::{NormalizedTrade, SymbolHints};

pub use duckdb_store::{DuckDbStore, StoreConfig};
pub use memory::MemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<::duckdb::Error> for StoreError {
    fn from(error: ::duckdb::Error) -> Self {
        Self::Query(error.to_string())
    }
}

/// Persisted ticker master record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub id: Uuid,
    pub ticker: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
}

/// Audit row written once per finished import session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportLogEntry {
    pub session_id: Uuid,
    pub portfolio_id: Uuid,
    pub broker: String,
    pub outcome: String,
    pub total_rows: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub message: String,
}

/// Record store contract consumed by the import pipeline.
///
/// Implementations must be `Send + Sync`; the pipeline issues store calls
/// concurrently within bounded chunks.
#[async_trait]
pub trait TradeStore: Send + Sync {
    /// Import precondition: the target portfolio must already exist.
    async fn portfolio_exists(&self, portfolio_id: Uuid) -> Result<bool, StoreError>;

    /// Create the portfolio row if it is missing.
    async fn ensure_portfolio(&self, portfolio_id: Uuid, name: &str) -> Result<(), StoreError>;

    /// Look up a symbol-master record by normalized ticker.
    async fn find_symbol(&self, ticker: &str) -> Result<Option<SymbolRecord>, StoreError>;

    /// Create a symbol-master record for a ticker that has no record yet.
    async fn create_symbol(
        &self,
        ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolRecord, StoreError>;

    /// Overwrite the descriptive fields of an existing symbol record.
    async fn update_symbol_hints(&self, id: Uuid, hints: &SymbolHints) -> Result<(), StoreError>;

    /// Persist one normalized trade and return its record id.
    async fn create_trade(
        &self,
        portfolio_id: Uuid,
        symbol_id: Uuid,
        trade: &NormalizedTrade,
    ) -> Result<Uuid, StoreError>;

    /// Append the audit row for a finished import session.
    async fn record_import(&self, entry: &ImportLogEntry) -> Result<(), StoreError>;
}

pub(crate) fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

pub(crate) fn sql_option_string(value: Option<&str>) -> String {
    match value {
        Some(value) => format!("'{}'", escape_sql_string(value)),
        None => String::from("NULL"),
    }
}
