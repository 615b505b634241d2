//! Interactive Brokers flex/trade export adapter.
//!
//! IBKR labels fills with a bare BUY/SELL side and no open/close signal.
//! The side is mapped to the *opening* variant (buy_to_open / sell_to_open).
//! That is a known approximation of the source data, kept deliberately:
//! downstream position logic expects the mapping to be stable, and the
//! export carries nothing better to infer from.

use wheelbook_core::{NormalizedTrade, SymbolHints, TradeAction};

use crate::adapters::{fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct InteractiveBrokersAdapter;

const REQUIRED: &[&str] = &["Symbol", "Date/Time", "Quantity", "T. Price", "Buy/Sell"];
const OPTIONAL: &[&str] = &["Comm/Fee", "Asset Category", "Proceeds", "Currency"];
const DISTINCTIVE: &[&str] = &["T. Price", "Comm/Fee", "Date/Time", "Buy/Sell"];

impl BrokerAdapter for InteractiveBrokersAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::InteractiveBrokers
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

    fn adapt_row(&self, row: &RawRow) -> RowOutcome {
        if let Some(category) = row.get_fuzzy("Asset Category") {
            if !category.to_ascii_lowercase().contains("option") {
                return RowOutcome::skip(format!("non-option asset category '{category}'"));
            }
        }

        let symbol_text = row.get_fuzzy("Symbol").unwrap_or("");
        let Some(leg) = fields::decode_compact_code(symbol_text) else {
            return RowOutcome::skip(format!("'{symbol_text}' is not an option symbol"));
        };

        let mut errors = Vec::new();

        let side = row.get_fuzzy("Buy/Sell").unwrap_or("").trim().to_ascii_uppercase();
        let action = match side.as_str() {
            "BUY" => Some(TradeAction::BuyToOpen),
            "SELL" => Some(TradeAction::SellToOpen),
            other => {
                errors.push(FieldError::invalid(
                    "Buy/Sell",
                    "bad_action",
                    format!("unrecognized side '{other}'"),
                ));
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

        let premium = match row.get_fuzzy("T. Price").and_then(fields::parse_money) {
            Some(price) => Some(price.abs()),
            None => {
                errors.push(FieldError::invalid(
                    "T. Price",
                    "bad_money",
                    "trade price is missing or not a number",
                ));
                None
            }
        };

        // "2023-12-15, 09:30:00" — the date part is before the comma.
        let date_text = row.get_fuzzy("Date/Time").unwrap_or("");
        let trade_date = match fields::parse_date(date_text.split(',').next().unwrap_or("")) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::invalid(
                    "Date/Time",
                    "bad_date",
                    "date/time is missing or unparseable",
                ));
                None
            }
        };

        let commission = row
            .get_fuzzy("Comm/Fee")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);

        match (errors.is_empty(), action, quantity, premium, trade_date) {
            (true, Some(action), Some(quantity), Some(premium), Some(trade_date)) => {
                RowOutcome::Trade(Box::new(NormalizedTrade {
                    symbol: leg.ticker,
                    option_type: leg.option_type,
                    strike_price: leg.strike,
                    expiration_date: leg.expiration,
                    trade_action: action,
                    quantity,
                    premium,
                    commission,
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

#[cfg(test)]
mod tests {
    use time::macros::date;
    use wheelbook_core::OptionType;

    use super::*;

    fn option_row(side: &str) -> RawRow {
        let mut row = RawRow::new(2);
        row.insert("Asset Category", "Equity and Index Options");
        row.insert("Symbol", "AAPL 231215C00150000");
        row.insert("Date/Time", "2023-11-01, 09:31:12");
        row.insert("Quantity", "-2");
        row.insert("T. Price", "1.25");
        row.insert("Comm/Fee", "-1.10");
        row.insert("Buy/Sell", side);
        row
    }

    #[test]
    fn bare_sides_default_to_opening_variant() {
        let RowOutcome::Trade(sell) = InteractiveBrokersAdapter.adapt_row(&option_row("SELL"))
        else {
            panic!("expected trade");
        };
        assert_eq!(sell.trade_action, TradeAction::SellToOpen);

        let RowOutcome::Trade(buy) = InteractiveBrokersAdapter.adapt_row(&option_row("BUY"))
        else {
            panic!("expected trade");
        };
        assert_eq!(buy.trade_action, TradeAction::BuyToOpen);
        assert_eq!(buy.option_type, OptionType::Call);
        assert_eq!(buy.trade_date, date!(2023 - 11 - 01));
        assert!((buy.commission - 1.10).abs() < f64::EPSILON);
    }

    #[test]
    fn stock_category_is_skipped() {
        let mut row = option_row("BUY");
        row.insert("Asset Category", "Stocks");
        // Re-insert overwrites; symbol stays an option code but the
        // category gate fires first.
        assert!(matches!(
            InteractiveBrokersAdapter.adapt_row(&row),
            RowOutcome::Skip { .. }
        ));
    }
}
