//! Robinhood activity export adapter.
//!
//! Robinhood mixes every account event into one export keyed by the
//! `Trans Code` column: option trades carry BTO/STO/BTC/STC, everything
//! else (ACH, CDIV, equity Buy/Sell, ...) is a non-option row. Option
//! identity lives only in the free-text `Description`.

use wheelbook_core::{NormalizedTrade, SymbolHints, TradeAction};

use crate::adapters::{fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct RobinhoodAdapter;

const REQUIRED: &[&str] = &["Activity Date", "Instrument", "Trans Code", "Quantity", "Price"];
const OPTIONAL: &[&str] = &["Description", "Process Date", "Settle Date", "Amount"];
const DISTINCTIVE: &[&str] = &["Trans Code", "Activity Date", "Settle Date"];

impl BrokerAdapter for RobinhoodAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::Robinhood
    }

    fn required_columns(&self) -> &'static [&'static str] {
        REQUIRED
    }

    fn optional_columns(&self) -> &'static [&'static str] {
        OPTIONAL
    }

    fn distinctive_columns(&self) -> &'static [&'static str] {
        DISTINCTIVE
    }

    fn description_column(&self) -> Option<&'static str> {
        Some("Description")
    }

    fn adapt_row(&self, row: &RawRow) -> RowOutcome {
        let trans_code = row.get_fuzzy("Trans Code").unwrap_or("").trim();
        let action = match trans_code.to_ascii_uppercase().as_str() {
            "BTO" => TradeAction::BuyToOpen,
            "STO" => TradeAction::SellToOpen,
            "BTC" => TradeAction::BuyToClose,
            "STC" => TradeAction::SellToClose,
            "" => {
                return RowOutcome::Invalid {
                    errors: vec![FieldError::missing("Trans Code")],
                }
            }
            other => {
                return RowOutcome::skip(format!("non-option transaction code '{other}'"));
            }
        };

        let mut errors = Vec::new();

        let leg = match row.get_fuzzy("Description") {
            Some(description) => match fields::decode_description(description) {
                Some(leg) => Some(leg),
                None => {
                    errors.push(FieldError::invalid(
                        "Description",
                        "bad_option_description",
                        format!("cannot decode option identity from '{description}'"),
                    ));
                    None
                }
            },
            None => {
                errors.push(FieldError::missing("Description"));
                None
            }
        };

        let quantity = match row.get_fuzzy("Quantity").and_then(fields::parse_quantity) {
            Some(quantity) => Some(quantity.unsigned_abs() as u32),
            None => {
                errors.push(FieldError::invalid(
                    "Quantity",
                    "bad_quantity",
                    "quantity is missing or not a whole number",
                ));
                None
            }
        };

        let premium = match row.get_fuzzy("Price").and_then(fields::parse_money) {
            Some(price) => Some(price.abs()),
            None => {
                errors.push(FieldError::invalid(
                    "Price",
                    "bad_money",
                    "price is missing or not a number",
                ));
                None
            }
        };

        let trade_date = match row.get_fuzzy("Activity Date").and_then(fields::parse_date) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::invalid(
                    "Activity Date",
                    "bad_date",
                    "activity date is missing or unparseable",
                ));
                None
            }
        };

        match (errors.is_empty(), leg, quantity, premium, trade_date) {
            (true, Some(leg), Some(quantity), Some(premium), Some(trade_date)) => {
                RowOutcome::Trade(Box::new(NormalizedTrade {
                    symbol: leg.ticker,
                    option_type: leg.option_type,
                    strike_price: leg.strike,
                    expiration_date: leg.expiration,
                    trade_action: action,
                    quantity,
                    premium,
                    commission: 0.0,
                    fees: 0.0,
                    trade_date,
                    notes: None,
                    hints: SymbolHints::default(),
                }))
            }
            _ => RowOutcome::Invalid { errors },
        }
    }
}
