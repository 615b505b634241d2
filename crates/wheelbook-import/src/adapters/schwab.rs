//! Charles Schwab transaction export adapter.
//!
//! Schwab spells the option identity in the `Symbol` column as
//! `AAPL 12/15/2023 150.00 C` and uses long-form actions
//! ("Sell to Open"). Commission and fees arrive combined in one
//! `Fees & Comm` column.

use wheelbook_core::{NormalizedTrade, OptionType, SymbolHints};

use crate::adapters::{action_from_words, fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct SchwabAdapter;

const REQUIRED: &[&str] = &["Date", "Action", "Symbol", "Quantity", "Price"];
const OPTIONAL: &[&str] = &["Description", "Fees & Comm", "Amount"];
const DISTINCTIVE: &[&str] = &["Fees & Comm", "Action", "Amount"];

/// Decode Schwab's spaced symbol form: `TICKER MM/DD/YYYY STRIKE C|P`.
fn decode_schwab_symbol(symbol: &str) -> Option<fields::OptionLeg> {
    let tokens: Vec<&str> = symbol.split_whitespace().collect();
    if tokens.len() != 4 {
        return fields::decode_compact_code(symbol);
    }

    let ticker: String = tokens[0]
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if ticker.is_empty() {
        return None;
    }

    let expiration = fields::parse_date(tokens[1])?;
    let strike = fields::parse_money(tokens[2]).filter(|value| *value > 0.0)?;
    let option_type = match tokens[3].to_ascii_uppercase().as_str() {
        "C" | "CALL" => OptionType::Call,
        "P" | "PUT" => OptionType::Put,
        _ => return None,
    };

    Some(fields::OptionLeg {
        ticker,
        option_type,
        strike,
        expiration,
    })
}

impl BrokerAdapter for SchwabAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::Schwab
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
        let symbol_text = row.get_fuzzy("Symbol").unwrap_or("");
        let leg = decode_schwab_symbol(symbol_text)
            .or_else(|| row.get_fuzzy("Description").and_then(fields::decode_description));

        let action_text = row.get_fuzzy("Action").unwrap_or("");
        let action = action_from_words(action_text);

        // Equity fills, dividends, and transfers share the export; a row
        // that has neither an option symbol nor an open/close action is not
        // an option trade.
        let Some(leg) = leg else {
            return RowOutcome::skip(format!(
                "'{symbol_text}' is not an option symbol"
            ));
        };

        let mut errors = Vec::new();

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
                    "trade date is missing or unparseable",
                ));
                None
            }
        };

        let commission = row
            .get_fuzzy("Fees & Comm")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);

        let hints = SymbolHints {
            name: row
                .get_fuzzy("Description")
                .filter(|text| fields::decode_description(text).is_none())
                .map(str::to_owned),
            exchange: None,
        };

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
                    hints,
                }))
            }
            _ => RowOutcome::Invalid { errors },
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;
    use wheelbook_core::TradeAction;

    use super::*;

    #[test]
    fn decodes_spaced_symbol() {
        let leg = decode_schwab_symbol("AAPL 12/15/2023 150.00 C").expect("decode");
        assert_eq!(leg.ticker, "AAPL");
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.expiration, date!(2023 - 12 - 15));
    }

    #[test]
    fn adapts_buy_to_close_put() {
        let mut row = RawRow::new(2);
        row.insert("Date", "11/20/2023");
        row.insert("Action", "Buy to Close");
        row.insert("Symbol", "TSLA 01/19/2024 200.00 P");
        row.insert("Quantity", "1");
        row.insert("Price", "$2.35");
        row.insert("Fees & Comm", "$0.66");

        let RowOutcome::Trade(trade) = SchwabAdapter.adapt_row(&row) else {
            panic!("expected trade");
        };
        assert_eq!(trade.trade_action, TradeAction::BuyToClose);
        assert_eq!(trade.option_type, OptionType::Put);
        assert!((trade.commission - 0.66).abs() < f64::EPSILON);
    }

    #[test]
    fn equity_fill_is_skipped() {
        let mut row = RawRow::new(3);
        row.insert("Date", "11/20/2023");
        row.insert("Action", "Buy");
        row.insert("Symbol", "AAPL");
        row.insert("Quantity", "10");
        row.insert("Price", "$180.00");

        assert!(matches!(
            SchwabAdapter.adapt_row(&row),
            RowOutcome::Skip { .. }
        ));
    }

    #[test]
    fn option_row_with_unmapped_action_is_invalid() {
        let mut row = RawRow::new(4);
        row.insert("Date", "11/20/2023");
        row.insert("Action", "Assigned");
        row.insert("Symbol", "TSLA 01/19/2024 200.00 P");
        row.insert("Quantity", "1");
        row.insert("Price", "$0.00");

        let RowOutcome::Invalid { errors } = SchwabAdapter.adapt_row(&row) else {
            panic!("expected invalid");
        };
        assert!(errors.iter().any(|error| error.field == "Action"));
    }
}
