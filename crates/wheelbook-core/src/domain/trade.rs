use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::ValidationError;

/// Shares represented by one option contract.
pub const CONTRACT_MULTIPLIER: u32 = 100;

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl Display for OptionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "call" | "c" => Ok(Self::Call),
            "put" | "p" => Ok(Self::Put),
            other => Err(ValidationError::InvalidOptionType {
                value: other.to_owned(),
            }),
        }
    }
}

/// Canonical four-way trade action.
///
/// Every broker action vocabulary is mapped onto these four values; the
/// open/close half of the label drives downstream position tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
}

impl TradeAction {
    pub const ALL: [Self; 4] = [
        Self::BuyToOpen,
        Self::SellToOpen,
        Self::BuyToClose,
        Self::SellToClose,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyToOpen => "buy_to_open",
            Self::SellToOpen => "sell_to_open",
            Self::BuyToClose => "buy_to_close",
            Self::SellToClose => "sell_to_close",
        }
    }

    pub const fn is_opening(self) -> bool {
        matches!(self, Self::BuyToOpen | Self::SellToOpen)
    }

    pub const fn is_buy(self) -> bool {
        matches!(self, Self::BuyToOpen | Self::BuyToClose)
    }
}

impl Display for TradeAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy_to_open" | "bto" => Ok(Self::BuyToOpen),
            "sell_to_open" | "sto" => Ok(Self::SellToOpen),
            "buy_to_close" | "btc" => Ok(Self::BuyToClose),
            "sell_to_close" | "stc" => Ok(Self::SellToClose),
            other => Err(ValidationError::InvalidTradeAction {
                value: other.to_owned(),
            }),
        }
    }
}

/// Best-effort descriptive fields for a symbol-master record, harvested
/// from whatever a broker row happens to carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolHints {
    pub name: Option<String>,
    pub exchange: Option<String>,
}

impl SymbolHints {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.exchange.is_none()
    }

    /// Merge another hint set into this one; the first non-empty value wins.
    pub fn merge(&mut self, other: &SymbolHints) {
        if self.name.is_none() {
            self.name.clone_from(&other.name);
        }
        if self.exchange.is_none() {
            self.exchange.clone_from(&other.exchange);
        }
    }
}

/// Canonical option trade record produced by the import pipeline.
///
/// `premium` is the per-share option price; multiply by `quantity` and
/// [`CONTRACT_MULTIPLIER`] for gross dollars. An `expiration_date` earlier
/// than `trade_date` is unusual but legal input (late exports, exercises),
/// so it is surfaced as a validation warning rather than rejected here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTrade {
    pub symbol: String,
    pub option_type: OptionType,
    pub strike_price: f64,
    pub expiration_date: Date,
    pub trade_action: TradeAction,
    pub quantity: u32,
    pub premium: f64,
    pub commission: f64,
    pub fees: f64,
    pub trade_date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "SymbolHints::is_empty")]
    pub hints: SymbolHints,
}

impl NormalizedTrade {
    /// Gross premium in dollars across all contracts.
    pub fn gross_premium(&self) -> f64 {
        self.premium * f64::from(self.quantity) * f64::from(CONTRACT_MULTIPLIER)
    }

    /// Total transaction costs.
    pub fn total_costs(&self) -> f64 {
        self.commission + self.fees
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn sample_trade() -> NormalizedTrade {
        NormalizedTrade {
            symbol: "AAPL".to_owned(),
            option_type: OptionType::Call,
            strike_price: 150.0,
            expiration_date: date!(2023 - 12 - 15),
            trade_action: TradeAction::SellToOpen,
            quantity: 2,
            premium: 1.25,
            commission: 0.65,
            fees: 0.04,
            trade_date: date!(2023 - 11 - 01),
            notes: None,
            hints: SymbolHints::default(),
        }
    }

    #[test]
    fn gross_premium_uses_contract_multiplier() {
        let trade = sample_trade();
        assert!((trade.gross_premium() - 250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn action_round_trips_through_str() {
        for action in TradeAction::ALL {
            assert_eq!(action.as_str().parse::<TradeAction>().unwrap(), action);
        }
    }

    #[test]
    fn hint_merge_keeps_first_non_empty() {
        let mut base = SymbolHints {
            name: Some("Apple Inc".to_owned()),
            exchange: None,
        };
        base.merge(&SymbolHints {
            name: Some("Apple Computer".to_owned()),
            exchange: Some("NASDAQ".to_owned()),
        });
        assert_eq!(base.name.as_deref(), Some("Apple Inc"));
        assert_eq!(base.exchange.as_deref(), Some("NASDAQ"));
    }

    #[test]
    fn trade_serializes_dates_as_strings() {
        let json = serde_json::to_value(sample_trade()).expect("serialize");
        assert_eq!(json["expiration_date"], "2023-12-15");
        assert_eq!(json["trade_action"], "sell_to_open");
    }
}
