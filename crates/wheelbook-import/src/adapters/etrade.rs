//! E*TRADE transaction export adapter.
//!
//! E*TRADE is the only supported format that labels the security type
//! directly (`SecurityType` = OPTN); anything else is skipped without
//! looking at the symbol. Option identity is spelled out in the symbol
//! or description: `AAPL Dec 15 '23 $150 Call`.

use wheelbook_core::{NormalizedTrade, SymbolHints};

use crate::adapters::{action_from_words, fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct EtradeAdapter;

const REQUIRED: &[&str] = &[
    "TransactionDate",
    "TransactionType",
    "SecurityType",
    "Symbol",
    "Quantity",
    "Price",
];
const OPTIONAL: &[&str] = &["Commission", "Amount", "Description"];
const DISTINCTIVE: &[&str] = &["TransactionType", "SecurityType", "TransactionDate"];

impl BrokerAdapter for EtradeAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::Etrade
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
        let security_type = row.get_fuzzy("SecurityType").unwrap_or("").trim();
        if !security_type.eq_ignore_ascii_case("OPTN") {
            return RowOutcome::skip(format!("non-option security type '{security_type}'"));
        }

        let transaction_type = row.get_fuzzy("TransactionType").unwrap_or("");
        let upper = transaction_type.to_ascii_uppercase();
        if upper.contains("EXPIR") || upper.contains("ASSIGN") {
            return RowOutcome::skip(format!(
                "lifecycle event, not a fill: '{transaction_type}'"
            ));
        }

        let mut errors = Vec::new();

        let symbol_text = row.get_fuzzy("Symbol").unwrap_or("");
        let leg = fields::decode_description(symbol_text)
            .or_else(|| fields::decode_compact_code(symbol_text))
            .or_else(|| row.get_fuzzy("Description").and_then(fields::decode_description));
        if leg.is_none() {
            errors.push(FieldError::invalid(
                "Symbol",
                "bad_option_symbol",
                format!("cannot decode option identity from '{symbol_text}'"),
            ));
        }

        let action = action_from_words(transaction_type);
        if action.is_none() {
            errors.push(FieldError::invalid(
                "TransactionType",
                "bad_action",
                format!("transaction type '{transaction_type}' has no open/close mapping"),
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

        let trade_date = match row.get_fuzzy("TransactionDate").and_then(fields::parse_date) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::invalid(
                    "TransactionDate",
                    "bad_date",
                    "transaction date is missing or unparseable",
                ));
                None
            }
        };

        let commission = row
            .get_fuzzy("Commission")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);

        let hints = SymbolHints {
            name: row
                .get_fuzzy("Description")
                .filter(|text| fields::decode_description(text).is_none())
                .map(str::to_owned),
            exchange: None,
        };

        match (errors.is_empty(), leg, action, quantity, premium, trade_date) {
            (true, Some(leg), Some(action), Some(quantity), Some(premium), Some(trade_date)) => {
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
