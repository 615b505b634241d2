//! Schema and business-rule validation for normalized trades.
//!
//! Errors block persistence; warnings are advisory unless strict mode
//! promotes them. Threshold warnings ("verify" checks) flag entries that
//! are legal but usually typos: a $150 per-share premium is almost always
//! a strike that landed in the wrong column.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use wheelbook_core::{NormalizedTrade, Ticker};

use crate::error::RecordIssue;

const PREMIUM_VERIFY_THRESHOLD: f64 = 100.0;
const STRIKE_VERIFY_THRESHOLD: f64 = 10_000.0;
const QUANTITY_VERIFY_THRESHOLD: u32 = 10_000;
/// Costs above this share of gross premium trigger a warning.
const COST_RATIO_THRESHOLD: f64 = 0.10;

/// Validation configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Promote every warning to a blocking error.
    pub strict: bool,
    /// Auto-normalize malformed tickers with a warning instead of
    /// rejecting them.
    pub normalize_tickers: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            strict: false,
            normalize_tickers: true,
        }
    }
}

/// Per-record validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub index: usize,
    pub is_valid: bool,
    pub errors: Vec<RecordIssue>,
    pub warnings: Vec<RecordIssue>,
}

/// Message frequency entry for batch aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCount {
    pub message: String,
    pub count: usize,
}

/// Aggregated batch validation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchValidationOutcome {
    pub total_records: usize,
    pub valid_records: usize,
    pub invalid_records: usize,
    pub outcomes: Vec<ValidationOutcome>,
    /// Ten most frequent error messages with counts.
    pub top_errors: Vec<MessageCount>,
    /// Ten most frequent warning messages with counts.
    pub top_warnings: Vec<MessageCount>,
}

fn issue(index: usize, field: &'static str, code: &'static str, message: impl Into<String>) -> RecordIssue {
    RecordIssue::new(Some(index), Some(field.to_owned()), code, message)
}

/// Validate one trade, normalizing the ticker in place when configured.
pub fn validate_trade(
    trade: &mut NormalizedTrade,
    index: usize,
    options: &ValidationOptions,
) -> ValidationOutcome {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (field, value) in [
        ("strike_price", trade.strike_price),
        ("premium", trade.premium),
        ("commission", trade.commission),
        ("fees", trade.fees),
    ] {
        if !value.is_finite() {
            errors.push(issue(
                index,
                field,
                "validation.not_finite",
                format!("{field} must be a finite number"),
            ));
        }
    }

    if trade.strike_price <= 0.0 {
        errors.push(issue(
            index,
            "strike_price",
            "validation.strike_not_positive",
            "Strike price must be positive",
        ));
    }
    if trade.quantity == 0 {
        errors.push(issue(
            index,
            "quantity",
            "validation.quantity_not_positive",
            "Quantity must be positive",
        ));
    }
    if trade.premium < 0.0 {
        errors.push(issue(
            index,
            "premium",
            "validation.premium_negative",
            "Premium cannot be negative",
        ));
    }

    if trade.expiration_date < trade.trade_date {
        warnings.push(issue(
            index,
            "expiration_date",
            "validation.expiration_before_trade",
            "Expiration date is before trade date",
        ));
    }
    if trade.commission < 0.0 {
        warnings.push(issue(
            index,
            "commission",
            "validation.commission_negative",
            "Commission is negative",
        ));
    }
    if trade.fees < 0.0 {
        warnings.push(issue(
            index,
            "fees",
            "validation.fees_negative",
            "Fees are negative",
        ));
    }

    if trade.premium > PREMIUM_VERIFY_THRESHOLD {
        warnings.push(issue(
            index,
            "premium",
            "validation.premium_verify",
            "Premium above $100 per share, verify entry",
        ));
    }
    if trade.strike_price > STRIKE_VERIFY_THRESHOLD {
        warnings.push(issue(
            index,
            "strike_price",
            "validation.strike_verify",
            "Strike price above $10,000, verify entry",
        ));
    }
    if trade.quantity > QUANTITY_VERIFY_THRESHOLD {
        warnings.push(issue(
            index,
            "quantity",
            "validation.quantity_verify",
            "Quantity above 10,000 contracts, verify entry",
        ));
    }

    let gross = trade.gross_premium();
    if gross > 0.0 && trade.total_costs() > gross * COST_RATIO_THRESHOLD {
        warnings.push(issue(
            index,
            "commission",
            "validation.cost_ratio",
            "Commission and fees exceed 10% of gross premium",
        ));
    }

    match Ticker::parse(&trade.symbol) {
        Ok(parsed) => {
            // Canonicalize case and whitespace silently.
            trade.symbol = parsed.as_str().to_owned();
        }
        Err(parse_error) => {
            if options.normalize_tickers {
                match Ticker::normalize_lossy(&trade.symbol) {
                    Some(normalized) => {
                        warnings.push(issue(
                            index,
                            "symbol",
                            "validation.ticker_normalized",
                            format!(
                                "Ticker '{}' normalized to '{}'",
                                trade.symbol, normalized
                            ),
                        ));
                        trade.symbol = normalized.as_str().to_owned();
                    }
                    None => {
                        errors.push(issue(
                            index,
                            "symbol",
                            "validation.ticker_invalid",
                            "Ticker must be 1-10 alphanumeric characters",
                        ));
                    }
                }
            } else {
                errors.push(issue(
                    index,
                    "symbol",
                    "validation.ticker_invalid",
                    format!("Ticker rejected: {parse_error}"),
                ));
            }
        }
    }

    if options.strict {
        errors.append(&mut warnings);
    }

    ValidationOutcome {
        index,
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Validate every trade in a batch and aggregate message frequencies.
pub fn validate_batch(
    trades: &mut [NormalizedTrade],
    options: &ValidationOptions,
) -> BatchValidationOutcome {
    let outcomes: Vec<ValidationOutcome> = trades
        .iter_mut()
        .enumerate()
        .map(|(index, trade)| validate_trade(trade, index, options))
        .collect();

    let valid_records = outcomes.iter().filter(|outcome| outcome.is_valid).count();
    let top_errors = top_messages(outcomes.iter().flat_map(|outcome| outcome.errors.iter()));
    let top_warnings = top_messages(outcomes.iter().flat_map(|outcome| outcome.warnings.iter()));

    BatchValidationOutcome {
        total_records: outcomes.len(),
        valid_records,
        invalid_records: outcomes.len() - valid_records,
        outcomes,
        top_errors,
        top_warnings,
    }
}

/// Rank messages by frequency, ties broken alphabetically, top ten kept.
fn top_messages<'a>(issues: impl Iterator<Item = &'a RecordIssue>) -> Vec<MessageCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record_issue in issues {
        *counts.entry(record_issue.message.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<MessageCount> = counts
        .into_iter()
        .map(|(message, count)| MessageCount {
            message: message.to_owned(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.message.cmp(&b.message)));
    ranked.truncate(10);
    ranked
}
