//! # Wheelbook Core
//!
//! Canonical domain contracts for the wheelbook trade bookkeeping toolkit.
//!
//! ## Overview
//!
//! This crate provides the foundational types shared by the import pipeline,
//! the warehouse, and the CLI:
//!
//! - **Canonical trade record** ([`NormalizedTrade`]) that every broker CSV
//!   format is adapted into
//! - **Option identity** types ([`OptionType`], strike, expiration)
//! - **Trade actions** ([`TradeAction`]) with the four-way open/close vocabulary
//! - **Ticker newtype** with parse-and-normalize semantics
//! - **Symbol-master hints** carried from raw rows to the symbol resolver
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`domain`] | Trade, action, and ticker models |
//! | [`error`] | Validation error types |

pub mod domain;
pub mod error;

pub use domain::{
    NormalizedTrade, OptionType, SymbolHints, Ticker, TradeAction, CONTRACT_MULTIPLIER,
};
pub use error::ValidationError;
