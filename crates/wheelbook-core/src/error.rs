use thiserror::Error;

/// Validation and contract errors exposed by `wheelbook-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("invalid trade action '{value}', expected one of buy_to_open, sell_to_open, buy_to_close, sell_to_close")]
    InvalidTradeAction { value: String },
    #[error("invalid option type '{value}', expected call or put")]
    InvalidOptionType { value: String },
}
