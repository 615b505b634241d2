//! Per-broker row adapters.
//!
//! Each adapter owns one broker's CSV dialect: its column set, its action
//! vocabulary, and the way it encodes option identity. Adapters never fail a
//! whole batch; a bad row yields [`RowOutcome::Invalid`] with every field
//! problem collected, and a row that simply is not an option trade yields
//! [`RowOutcome::Skip`].

pub mod fields;

mod etrade;
mod fidelity;
mod generic;
mod ibkr;
mod robinhood;
mod schwab;

use wheelbook_core::{NormalizedTrade, TradeAction};

use crate::broker::BrokerId;
use crate::classify;
use crate::parser::RawRow;

pub use etrade::EtradeAdapter;
pub use fidelity::FidelityAdapter;
pub use generic::GenericAdapter;
pub use ibkr::InteractiveBrokersAdapter;
pub use robinhood::RobinhoodAdapter;
pub use schwab::SchwabAdapter;

/// One field-level problem found while adapting a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            code: "missing_column",
            message: format!("required column '{field}' is empty or missing"),
        }
    }

    pub fn invalid(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

/// Three-way adaptation outcome for one raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    /// The row is an option trade and adapted cleanly.
    Trade(Box<NormalizedTrade>),
    /// The row is valid input but not an option trade (cash movement,
    /// equity fill, dividend); excluded without counting as an error.
    Skip { reason: String },
    /// The row should be an option trade but has field problems; all of
    /// them are reported at once.
    Invalid { errors: Vec<FieldError> },
}

impl RowOutcome {
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: reason.into(),
        }
    }

    pub const fn is_trade(&self) -> bool {
        matches!(self, Self::Trade(_))
    }
}

/// Broker CSV dialect contract.
pub trait BrokerAdapter: Send + Sync {
    fn broker(&self) -> BrokerId;

    /// Columns that must all be present for this format to match.
    fn required_columns(&self) -> &'static [&'static str];

    /// Columns the format may carry; informational only.
    fn optional_columns(&self) -> &'static [&'static str];

    /// Columns rarely seen outside this broker's exports; each one found
    /// raises detection confidence.
    fn distinctive_columns(&self) -> &'static [&'static str];

    /// Free-text description column, when the format has one. Its presence
    /// is a structural detection cue.
    fn description_column(&self) -> Option<&'static str> {
        None
    }

    /// Detection confidence in [0, 1] for the given header set.
    fn can_handle(&self, headers: &[String]) -> f64
    where
        Self: Sized,
    {
        classify::score_headers(headers, self).confidence
    }

    /// Adapt one raw row into the canonical trade record.
    fn adapt_row(&self, row: &RawRow) -> RowOutcome;
}

/// Map a free-word action phrase ("YOU BOUGHT OPENING TRANSACTION",
/// "Sell to Open") onto the canonical four-way enum. Returns `None` when
/// the open/close half is absent.
pub(crate) fn action_from_words(text: &str) -> Option<TradeAction> {
    let lower = text.to_ascii_lowercase();
    let buy = lower.contains("buy") || lower.contains("bought");
    let sell = lower.contains("sell") || lower.contains("sold");
    let open = lower.contains("open");
    let close = lower.contains("close");

    match (buy, sell, open, close) {
        (true, false, true, false) => Some(TradeAction::BuyToOpen),
        (true, false, false, true) => Some(TradeAction::BuyToClose),
        (false, true, true, false) => Some(TradeAction::SellToOpen),
        (false, true, false, true) => Some(TradeAction::SellToClose),
        _ => None,
    }
}
