mod ticker;
mod trade;

pub use ticker::Ticker;
pub use trade::{NormalizedTrade, OptionType, SymbolHints, TradeAction, CONTRACT_MULTIPLIER};
