//! Ticker-to-symbol-record resolution.
//!
//! Every trade references a symbol master record; the resolver looks
//! tickers up in the store, creates missing records when configured to,
//! and memoizes results in a bounded cache so a ten-thousand-row import
//! of a dozen tickers touches the store a dozen times.
//!
//! Creation is guarded per ticker: while one creation is in flight, a
//! concurrent request for the same ticker fails fast instead of racing
//! the store into a duplicate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use wheelbook_core::{SymbolHints, Ticker};
use wheelbook_warehouse::{StoreError, SymbolRecord, TradeStore};

use crate::error::ImportError;

/// Tickers resolved concurrently per chunk in [`SymbolResolver::resolve_batch`].
const RESOLVE_CHUNK_SIZE: usize = 50;

/// Resolver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Create symbol records for unknown tickers.
    pub auto_create: bool,
    /// Reject tickers that fail strict format validation instead of
    /// normalizing them lossily.
    pub validate_format: bool,
    /// Overwrite descriptive fields of existing records from row hints.
    pub update_existing: bool,
    pub cache_enabled: bool,
    pub cache_max_size: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            auto_create: true,
            validate_format: true,
            update_existing: false,
            cache_enabled: true,
            cache_max_size: 1_000,
        }
    }
}

/// Result of resolving one ticker.
#[derive(Debug, Clone)]
pub struct SymbolLookup {
    /// Record existed before this call.
    pub found: bool,
    /// Record was created by this call.
    pub created: bool,
    /// Record is missing and auto-creation is disabled.
    pub needs_creation: bool,
    pub record: Option<SymbolRecord>,
}

/// Aggregated result of [`SymbolResolver::resolve_batch`].
#[derive(Debug, Default)]
pub struct BatchResolution {
    /// Normalized ticker to record, for every ticker that resolved.
    pub resolved: HashMap<String, SymbolRecord>,
    /// Tickers with no record and auto-creation disabled.
    pub missing: Vec<String>,
    pub failures: Vec<(String, ImportError)>,
    /// The batch was interrupted by cancellation; untouched tickers are
    /// absent from every other field.
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct ResolverState {
    cache: HashMap<String, SymbolRecord>,
    /// Insertion order; the oldest entry is evicted first.
    order: VecDeque<String>,
    in_flight: HashSet<String>,
}

impl ResolverState {
    fn cache_insert(&mut self, record: SymbolRecord, max_size: usize) {
        if max_size == 0 {
            return;
        }
        if self.cache.insert(record.ticker.clone(), record.clone()).is_none() {
            self.order.push_back(record.ticker);
        }
        while self.cache.len() > max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.cache.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

/// Resolves tickers against a [`TradeStore`], with caching and guarded
/// auto-creation.
pub struct SymbolResolver {
    store: Arc<dyn TradeStore>,
    options: ResolverOptions,
    state: Mutex<ResolverState>,
}

impl SymbolResolver {
    pub fn new(store: Arc<dyn TradeStore>, options: ResolverOptions) -> Self {
        Self {
            store,
            options,
            state: Mutex::new(ResolverState::default()),
        }
    }

    /// Normalize a raw ticker per the configured validation policy.
    pub fn normalize(&self, raw: &str) -> Result<Ticker, ImportError> {
        if self.options.validate_format {
            Ticker::parse(raw).map_err(|error| ImportError::invalid_ticker(error.to_string()))
        } else {
            Ticker::normalize_lossy(raw).ok_or_else(|| {
                ImportError::invalid_ticker(format!("'{raw}' has no usable characters"))
            })
        }
    }

    /// Resolve one ticker, consulting the cache first.
    pub async fn resolve(
        &self,
        raw_ticker: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolLookup, ImportError> {
        let ticker = self.normalize(raw_ticker)?;
        let key = ticker.as_str().to_owned();

        if self.options.cache_enabled {
            let state = self.state.lock().await;
            if let Some(record) = state.cache.get(&key) {
                return Ok(SymbolLookup {
                    found: true,
                    created: false,
                    needs_creation: false,
                    record: Some(record.clone()),
                });
            }
        }

        if let Some(record) = self.store.find_symbol(&key).await? {
            let record = if self.options.update_existing && !hints.is_empty() {
                let merged = SymbolHints {
                    name: hints.name.clone().or_else(|| record.name.clone()),
                    exchange: hints.exchange.clone().or_else(|| record.exchange.clone()),
                };
                self.store.update_symbol_hints(record.id, &merged).await?;
                SymbolRecord {
                    name: merged.name,
                    exchange: merged.exchange,
                    ..record
                }
            } else {
                record
            };
            self.remember(record.clone()).await;
            return Ok(SymbolLookup {
                found: true,
                created: false,
                needs_creation: false,
                record: Some(record),
            });
        }

        if !self.options.auto_create {
            return Ok(SymbolLookup {
                found: false,
                created: false,
                needs_creation: true,
                record: None,
            });
        }

        self.create_guarded(&key, hints).await
    }

    /// Resolve a batch of distinct tickers in bounded concurrent chunks.
    ///
    /// Tickers are processed in sorted order so retries see a stable
    /// chunking. Individual failures do not abort the batch.
    pub async fn resolve_batch(
        &self,
        requests: &HashMap<String, SymbolHints>,
    ) -> BatchResolution {
        self.resolve_batch_with_cancel(requests, &AtomicBool::new(false))
            .await
    }

    /// [`Self::resolve_batch`] with a cooperative cancel flag, observed
    /// between chunks.
    pub async fn resolve_batch_with_cancel(
        &self,
        requests: &HashMap<String, SymbolHints>,
        cancel: &AtomicBool,
    ) -> BatchResolution {
        let mut tickers: Vec<&String> = requests.keys().collect();
        tickers.sort();

        let mut resolution = BatchResolution::default();
        for chunk in tickers.chunks(RESOLVE_CHUNK_SIZE) {
            if cancel.load(Ordering::SeqCst) {
                resolution.cancelled = true;
                break;
            }
            let lookups = join_all(chunk.iter().map(|raw| {
                let hints = &requests[*raw];
                async move { ((*raw).clone(), self.resolve(raw, hints).await) }
            }))
            .await;

            for (raw, outcome) in lookups {
                match outcome {
                    Ok(lookup) => match lookup.record {
                        Some(record) => {
                            resolution.resolved.insert(record.ticker.clone(), record);
                        }
                        None => resolution.missing.push(raw),
                    },
                    Err(error) => resolution.failures.push((raw, error)),
                }
            }
        }
        resolution
    }

    /// Drop every cached record; the next lookups go back to the store.
    pub async fn invalidate_cache(&self) {
        let mut state = self.state.lock().await;
        state.cache.clear();
        state.order.clear();
    }

    pub async fn cache_len(&self) -> usize {
        self.state.lock().await.cache.len()
    }

    async fn remember(&self, record: SymbolRecord) {
        if !self.options.cache_enabled {
            return;
        }
        let mut state = self.state.lock().await;
        state.cache_insert(record, self.options.cache_max_size);
    }

    async fn create_guarded(
        &self,
        key: &str,
        hints: &SymbolHints,
    ) -> Result<SymbolLookup, ImportError> {
        {
            let mut state = self.state.lock().await;
            if !state.in_flight.insert(key.to_owned()) {
                return Err(ImportError::symbol_creation_in_flight(key));
            }
        }

        let created = self.store.create_symbol(key, hints).await;

        {
            let mut state = self.state.lock().await;
            state.in_flight.remove(key);
        }

        match created {
            Ok(record) => {
                debug!(ticker = key, id = %record.id, "created symbol record");
                self.remember(record.clone()).await;
                Ok(SymbolLookup {
                    found: false,
                    created: true,
                    needs_creation: false,
                    record: Some(record),
                })
            }
            // Another writer (outside this resolver) inserted first; the
            // record it created is the one we want.
            Err(StoreError::Conflict(_)) => match self.store.find_symbol(key).await? {
                Some(record) => {
                    self.remember(record.clone()).await;
                    Ok(SymbolLookup {
                        found: true,
                        created: false,
                        needs_creation: false,
                        record: Some(record),
                    })
                }
                None => Err(ImportError::storage(format!(
                    "symbol '{key}' conflicted on create but cannot be found"
                ))),
            },
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wheelbook_warehouse::MemoryStore;

    use super::*;

    fn resolver(store: Arc<MemoryStore>, options: ResolverOptions) -> SymbolResolver {
        SymbolResolver::new(store, options)
    }

    #[tokio::test]
    async fn creates_missing_symbol_once_and_caches_it() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(store.clone(), ResolverOptions::default());

        let first = subject
            .resolve("AAPL", &SymbolHints::default())
            .await
            .unwrap();
        assert!(first.created);

        let second = subject
            .resolve("AAPL", &SymbolHints::default())
            .await
            .unwrap();
        assert!(second.found);
        assert_eq!(store.create_calls("AAPL").await, 1);
        assert_eq!(subject.cache_len().await, 1);
    }

    #[tokio::test]
    async fn missing_symbol_reported_when_auto_create_disabled() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(
            store,
            ResolverOptions {
                auto_create: false,
                ..ResolverOptions::default()
            },
        );

        let lookup = subject
            .resolve("TSLA", &SymbolHints::default())
            .await
            .unwrap();
        assert!(lookup.needs_creation);
        assert!(lookup.record.is_none());
    }

    #[tokio::test]
    async fn strict_format_rejects_malformed_tickers() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(store, ResolverOptions::default());

        let error = subject
            .resolve("BRK.B!", &SymbolHints::default())
            .await
            .unwrap_err();
        assert_eq!(error.code(), "import.invalid_ticker");
    }

    #[tokio::test]
    async fn lossy_normalization_applies_when_validation_disabled() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(
            store,
            ResolverOptions {
                validate_format: false,
                ..ResolverOptions::default()
            },
        );

        let lookup = subject
            .resolve("brk.b", &SymbolHints::default())
            .await
            .unwrap();
        assert_eq!(lookup.record.unwrap().ticker, "BRKB");
    }

    #[tokio::test]
    async fn concurrent_creation_of_same_ticker_fails_fast() {
        let store = Arc::new(MemoryStore::new());
        store.set_symbol_create_delay(Duration::from_millis(50)).await;
        let subject = Arc::new(resolver(store.clone(), ResolverOptions::default()));

        let hints = SymbolHints::default();
        let (first, second) = tokio::join!(
            subject.resolve("NVDA", &hints),
            async {
                // Let the first call claim the in-flight guard.
                tokio::time::sleep(Duration::from_millis(10)).await;
                subject.resolve("NVDA", &hints).await
            }
        );

        assert!(first.unwrap().created);
        assert_eq!(
            second.unwrap_err().code(),
            "import.symbol_creation_in_flight"
        );
        assert_eq!(store.create_calls("NVDA").await, 1);
    }

    #[tokio::test]
    async fn cache_evicts_oldest_inserted_entry() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(
            store.clone(),
            ResolverOptions {
                cache_max_size: 2,
                ..ResolverOptions::default()
            },
        );

        for ticker in ["AAA", "BBB", "CCC"] {
            subject
                .resolve(ticker, &SymbolHints::default())
                .await
                .unwrap();
        }
        assert_eq!(subject.cache_len().await, 2);

        // AAA was evicted; resolving it again goes back to the store but
        // not to create_symbol, which would conflict.
        let lookup = subject
            .resolve("AAA", &SymbolHints::default())
            .await
            .unwrap();
        assert!(lookup.found);
        assert_eq!(store.create_calls("AAA").await, 1);
    }

    #[tokio::test]
    async fn update_existing_merges_hints_into_the_record() {
        let store = Arc::new(MemoryStore::new());
        let seed = resolver(store.clone(), ResolverOptions::default());
        seed.resolve("AMD", &SymbolHints::default()).await.unwrap();

        let subject = resolver(
            store,
            ResolverOptions {
                update_existing: true,
                ..ResolverOptions::default()
            },
        );
        let hints = SymbolHints {
            name: Some("Advanced Micro Devices".to_owned()),
            exchange: None,
        };
        let lookup = subject.resolve("AMD", &hints).await.unwrap();
        assert_eq!(
            lookup.record.unwrap().name.as_deref(),
            Some("Advanced Micro Devices")
        );
    }

    #[tokio::test]
    async fn batch_resolution_stops_at_the_chunk_boundary_when_cancelled() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(store.clone(), ResolverOptions::default());

        let mut requests = HashMap::new();
        for n in 0..120 {
            requests.insert(format!("TK{n:03}"), SymbolHints::default());
        }

        let cancel = AtomicBool::new(true);
        let resolution = subject.resolve_batch_with_cancel(&requests, &cancel).await;
        assert!(resolution.cancelled);
        assert!(resolution.resolved.is_empty());
        assert_eq!(store.symbol_count().await, 0);
    }

    #[tokio::test]
    async fn batch_resolution_partitions_outcomes() {
        let store = Arc::new(MemoryStore::new());
        let subject = resolver(store, ResolverOptions::default());

        let mut requests = HashMap::new();
        requests.insert("AAPL".to_owned(), SymbolHints::default());
        requests.insert("TSLA".to_owned(), SymbolHints::default());
        requests.insert("!!!".to_owned(), SymbolHints::default());

        let resolution = subject.resolve_batch(&requests).await;
        assert_eq!(resolution.resolved.len(), 2);
        assert_eq!(resolution.failures.len(), 1);
        assert!(resolution.missing.is_empty());
    }
}
