//! Fidelity transaction export adapter.
//!
//! Fidelity writes the option identity as a compact code with a leading
//! dash (`-AAPL231215C150`) and verbose sentence actions
//! ("YOU BOUGHT OPENING TRANSACTION"). Commission and fees come in
//! separate dollar-suffixed columns.

use wheelbook_core::{NormalizedTrade, SymbolHints};

use crate::adapters::{action_from_words, fields, BrokerAdapter, FieldError, RowOutcome};
use crate::broker::BrokerId;
use crate::parser::RawRow;

#[derive(Debug, Clone, Copy, Default)]
pub struct FidelityAdapter;

const REQUIRED: &[&str] = &["Run Date", "Action", "Symbol", "Quantity", "Price ($)"];
const OPTIONAL: &[&str] = &[
    "Description",
    "Type",
    "Commission ($)",
    "Fees ($)",
    "Amount ($)",
    "Settlement Date",
];
const DISTINCTIVE: &[&str] = &["Run Date", "Price ($)", "Commission ($)", "Fees ($)"];

impl BrokerAdapter for FidelityAdapter {
    fn broker(&self) -> BrokerId {
        BrokerId::Fidelity
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
        let leg = fields::decode_compact_code(symbol_text)
            .or_else(|| row.get_fuzzy("Description").and_then(fields::decode_description));

        let Some(leg) = leg else {
            return RowOutcome::skip(format!("'{symbol_text}' is not an option symbol"));
        };

        let action_text = row.get_fuzzy("Action").unwrap_or("");
        let upper = action_text.to_ascii_uppercase();
        if upper.contains("EXPIRED") || upper.contains("ASSIGNED") || upper.contains("EXERCISE") {
            return RowOutcome::skip(format!("lifecycle event, not a fill: '{action_text}'"));
        }

        let mut errors = Vec::new();
        let action = action_from_words(action_text);
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

        let premium = match row.get_fuzzy("Price ($)").and_then(fields::parse_money) {
            Some(price) => Some(price.abs()),
            None => {
                errors.push(FieldError::invalid(
                    "Price ($)",
                    "bad_money",
                    "price is missing or not a number",
                ));
                None
            }
        };

        let trade_date = match row.get_fuzzy("Run Date").and_then(fields::parse_date) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::invalid(
                    "Run Date",
                    "bad_date",
                    "run date is missing or unparseable",
                ));
                None
            }
        };

        let commission = row
            .get_fuzzy("Commission ($)")
            .and_then(fields::parse_money)
            .map_or(0.0, f64::abs);
        let fees = row
            .get_fuzzy("Fees ($)")
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
                    fees,
                    trade_date,
                    notes: None,
                    hints,
                }))
            }
            _ => RowOutcome::Invalid { errors },
        }
    }
}
