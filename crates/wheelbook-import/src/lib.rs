//! # Wheelbook Import
//!
//! Brokerage CSV import pipeline for the wheelbook trade journal.
//!
//! ## Overview
//!
//! This crate turns raw brokerage activity exports into normalized
//! option-trade records:
//!
//! - **Tolerant tabular parsing** with delimiter sniffing and encoding fallback
//! - **Broker format detection** scored from header sets, with rationale
//! - **Row adapters** for Robinhood, Schwab, Fidelity, E*TRADE, and
//!   Interactive Brokers, plus a generic fallback
//! - **Validation** with blocking errors, advisory warnings, and strict mode
//! - **Symbol resolution** with caching and guarded auto-creation
//! - **Batch orchestration** with bounded concurrency, error budgets,
//!   cooperative cancellation, and progress reporting
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Broker row adapters and field decoding |
//! | [`broker`] | Broker identifiers |
//! | [`classify`] | Header-based broker format detection |
//! | [`config`] | Import session configuration |
//! | [`error`] | Pipeline errors and record issues |
//! | [`parser`] | Tolerant CSV parsing |
//! | [`pipeline`] | Batch import orchestration |
//! | [`progress`] | Session progress tracking |
//! | [`resolve`] | Ticker-to-symbol resolution |
//! | [`validate`] | Trade validation rules |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wheelbook_import::{ImportConfig, ImportPipeline};
//! use wheelbook_warehouse::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = ImportPipeline::new(store);
//! let config = ImportConfig::new(portfolio_id);
//! let report = pipeline.import_file(path, &config).await;
//! println!("{}: {}", report.outcome, report.message);
//! ```

pub mod adapters;
pub mod broker;
pub mod classify;
pub mod config;
pub mod error;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod validate;

pub use broker::BrokerId;
pub use classify::{BrokerDetection, FormatClassifier};
pub use config::ImportConfig;
pub use error::{ImportError, ImportErrorKind, RecordIssue};
pub use parser::SourceEncoding;
pub use pipeline::{ImportOutcome, ImportPipeline, ImportReport, PreviewReport};
pub use progress::{
    ImportStatus, ImportSummary, ProgressRegistry, ProgressSnapshot, ProgressTracker,
};
pub use resolve::{ResolverOptions, SymbolResolver};
pub use validate::{BatchValidationOutcome, ValidationOptions};
