//! Generic fallback adapter for hand-built or unknown CSVs.
//!
//! Accepts a plain column set (symbol/date/action/quantity/price) with the
//! option identity either in a compact code or spelled out in dedicated
//! strike/expiration/type columns. Its distinctive columns are exactly
//! those explicit option columns, which no real broker export carries
//! together, so a real broker format still outscores it on its own sheet.

use std::str::FromStr;

use wheelbook_core::{NormalizedTrade, OptionType, SymbolHints, TradeAction};

use crate::adapters::{action_from_words, fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAdapter;

const REQUIRED: &[&str] = &["Symbol", "Date", "Action", "Quantity", "Price"];
const OPTIONAL: &[&str] = &[
    "Strike",
    "Expiration",
    "Type",
    "Commission",
    "Fees",
    "Notes",
];
const DISTINCTIVE: &[&str] = &["Strike", "Expiration", "Type"];

impl BrokerAdapter for GenericAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::Generic
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
        let symbol_text = row.get_fuzzy("Symbol").unwrap_or("");

        // Either the symbol is a compact option code, or the sheet carries
        // explicit strike/expiration/type columns next to a bare ticker.
        let leg = fields::decode_compact_code(symbol_text).or_else(|| {
            let strike = row.get_fuzzy("Strike").and_then(fields::parse_money)?;
            let expiration = row.get_fuzzy("Expiration").and_then(fields::parse_date)?;
            let option_type = row
                .get_fuzzy("Type")
                .and_then(|value| OptionType::from_str(value).ok())?;
            let ticker: String = symbol_text
                .chars()
                .filter(|ch| ch.is_ascii_alphanumeric())
                .map(|ch| ch.to_ascii_uppercase())
                .collect();
            // A non-positive strike still forms a leg here; validation
            // owns that rule and reports it per record.
            if ticker.is_empty() {
                return None;
            }
            Some(fields::OptionLeg {
                ticker,
                option_type,
                strike,
                expiration,
            })
        });

        let Some(leg) = leg else {
            return RowOutcome::skip(format!("'{symbol_text}' is not an option row"));
        };

        let mut errors = Vec::new();

        let action_text = row.get_fuzzy("Action").unwrap_or("");
        let action = TradeAction::from_str(action_text)
            .ok()
            .or_else(|| action_from_words(action_text));
        if action.is_none() {
            errors.push(FieldError::invalid(
                "Action",
                "bad_action",
                format!("action '{action_text}' has no open/close mapping"),
            ));
        }

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

        let trade_date = match row.get_fuzzy("Date").and_then(fields::parse_date) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::invalid(
                    "Date",
                    "bad_date",
                    "date is missing or unparseable",
                ));
                None
            }
        };

        let commission = row
            .get_fuzzy("Commission")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);
        let fees = row
            .get_fuzzy("Fees")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);
        let notes = row.get_fuzzy("Notes").map(str::to_owned);

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
                    fees,
                    trade_date,
                    notes,
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

    use super::*;

    #[test]
    fn adapts_explicit_columns() {
        let mut row = RawRow::new(2);
        row.insert("Symbol", "TSLA");
        row.insert("Date", "2023-11-01");
        row.insert("Action", "sell_to_open");
        row.insert("Quantity", "1");
        row.insert("Price", "2.00");
        row.insert("Strike", "200");
        row.insert("Expiration", "2024-01-19");
        row.insert("Type", "put");
        row.insert("Notes", "wheel entry");

        let RowOutcome::Trade(trade) = GenericAdapter.adapt_row(&row) else {
            panic!("expected trade");
        };
        assert_eq!(trade.symbol, "TSLA");
        assert_eq!(trade.option_type, OptionType::Put);
        assert_eq!(trade.expiration_date, date!(2024 - 01 - 19));
        assert_eq!(trade.notes.as_deref(), Some("wheel entry"));
    }

    #[test]
    fn adapts_compact_symbol_with_shorthand_action() {
        let mut row = RawRow::new(3);
        row.insert("Symbol", "AAPL231215C00150000");
        row.insert("Date", "2023-11-01");
        row.insert("Action", "STO");
        row.insert("Quantity", "2");
        row.insert("Price", "1.25");

        let RowOutcome::Trade(trade) = GenericAdapter.adapt_row(&row) else {
            panic!("expected trade");
        };
        assert_eq!(trade.trade_action, TradeAction::SellToOpen);
        assert!((trade.strike_price - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bare_ticker_without_option_columns_is_skipped() {
        let mut row = RawRow::new(4);
        row.insert("Symbol", "AAPL");
        row.insert("Date", "2023-11-01");
        row.insert("Action", "buy");
        row.insert("Quantity", "10");
        row.insert("Price", "180.00");

        assert!(matches!(
            GenericAdapter.adapt_row(&row),
            RowOutcome::Skip { .. }
        ));
    }
}
