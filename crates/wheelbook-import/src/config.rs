//! Import session configuration.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::broker::BrokerId;
use crate::parser::SourceEncoding;
use crate::resolve::ResolverOptions;
use crate::validate::ValidationOptions;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;

/// Per-session configuration for [`crate::pipeline::ImportPipeline`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Target portfolio; must exist before the import starts.
    pub portfolio_id: Uuid,
    /// Skip detection and force a specific broker adapter.
    pub broker: Option<BrokerId>,
    /// Override delimiter sniffing.
    pub delimiter: Option<u8>,
    pub encoding: SourceEncoding,
    pub validation: ValidationOptions,
    pub resolver: ResolverOptions,
    /// Records persisted per concurrent sub-batch.
    pub batch_size: usize,
    /// Minimum milliseconds between observer notifications.
    pub progress_interval_ms: u64,
    /// Abort on the first persistence failure.
    pub stop_on_first_error: bool,
    /// Abort once this many persistence failures accumulate.
    pub max_errors: Option<usize>,
    /// Import the valid records of a batch that also contains invalid
    /// ones; when false, any invalid record fails the whole import.
    pub skip_invalid_records: bool,
}

impl ImportConfig {
    pub fn new(portfolio_id: Uuid) -> Self {
        Self {
            portfolio_id,
            broker: None,
            delimiter: None,
            encoding: SourceEncoding::Utf8,
            validation: ValidationOptions::default(),
            resolver: ResolverOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            stop_on_first_error: false,
            max_errors: None,
            skip_invalid_records: true,
        }
    }

    /// Batch size with a floor of one, so a zero in a config file cannot
    /// stall the persistence loop.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
