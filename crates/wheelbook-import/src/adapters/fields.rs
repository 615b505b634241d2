//! Shared field decoding for broker rows.
//!
//! Brokers encode the same option identity two incompatible ways: a compact
//! alphanumeric code (`AAPL231215C00150000`) or a free-text description
//! (`AAPL 12/15/2023 Call $150.00`). Numerics arrive with currency symbols,
//! thousands separators, and parenthesis negatives; dates arrive in half a
//! dozen shapes including spreadsheet serials. Everything here is pure and
//! deterministic.

use time::{Date, Duration, Month};

use wheelbook_core::OptionType;

/// Option identity extracted from a single row field.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionLeg {
    pub ticker: String,
    pub option_type: OptionType,
    pub strike: f64,
    pub expiration: Date,
}

const MONTH_NAMES: [(&str, Month); 12] = [
    ("jan", Month::January),
    ("feb", Month::February),
    ("mar", Month::March),
    ("apr", Month::April),
    ("may", Month::May),
    ("jun", Month::June),
    ("jul", Month::July),
    ("aug", Month::August),
    ("sep", Month::September),
    ("oct", Month::October),
    ("nov", Month::November),
    ("dec", Month::December),
];

fn month_from_name(token: &str) -> Option<Month> {
    let key: String = token
        .chars()
        .filter(|ch| ch.is_ascii_alphabetic())
        .map(|ch| ch.to_ascii_lowercase())
        .take(3)
        .collect();
    MONTH_NAMES
        .iter()
        .find(|(name, _)| *name == key && key.len() == 3)
        .map(|(_, month)| *month)
}

fn calendar_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

fn expand_two_digit_year(year: i32) -> i32 {
    if (0..100).contains(&year) {
        2000 + year
    } else {
        year
    }
}

/// Spreadsheet day serials count from 1899-12-30 (the historical Lotus
/// epoch, off by one from 1900-01-00 on purpose).
pub fn spreadsheet_serial_to_date(serial: i64) -> Option<Date> {
    if !(1..=219_511).contains(&serial) {
        return None;
    }
    let epoch = Date::from_calendar_date(1899, Month::December, 30).ok()?;
    epoch.checked_add(Duration::days(serial))
}

/// Parse a date from the shapes brokers actually emit:
/// `2023-12-15`, `12/15/2023`, `12/15/23`, `20231215`, `Dec 15, 2023`,
/// `15-Dec-2023`, and bare spreadsheet serials like `45275`.
pub fn parse_date(input: &str) -> Option<Date> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Timestamps like "2023-12-15 09:30:00" or "2023-12-15T09:30": keep the
    // date part.
    let trimmed = trimmed
        .split(|ch: char| ch == 'T' || ch == ' ')
        .next()
        .unwrap_or(trimmed);

    if let Some(date) = parse_separated_date(trimmed, '/') {
        return Some(date);
    }
    if let Some(date) = parse_separated_date(trimmed, '-') {
        return Some(date);
    }

    if trimmed.chars().all(|ch| ch.is_ascii_digit()) {
        if trimmed.len() == 8 {
            let year: i32 = trimmed[0..4].parse().ok()?;
            let month: u8 = trimmed[4..6].parse().ok()?;
            let day: u8 = trimmed[6..8].parse().ok()?;
            return calendar_date(year, month, day);
        }
        let serial: i64 = trimmed.parse().ok()?;
        // Only plausible modern serials; anything else is more likely a
        // mis-mapped column.
        if (20_000..=80_000).contains(&serial) {
            return spreadsheet_serial_to_date(serial);
        }
        return None;
    }

    parse_spelled_date(trimmed)
}

fn parse_separated_date(input: &str, separator: char) -> Option<Date> {
    let parts: Vec<&str> = input.split(separator).collect();
    if parts.len() != 3 {
        return None;
    }

    // 15-Dec-2023 / Dec-15-2023
    if let Some(month) = month_from_name(parts[1]) {
        let day: u8 = parts[0].trim().parse().ok()?;
        let year: i32 = parts[2].trim().parse().map(expand_two_digit_year).ok()?;
        return Date::from_calendar_date(year, month, day).ok();
    }
    if let Some(month) = month_from_name(parts[0]) {
        let day: u8 = parts[1].trim().parse().ok()?;
        let year: i32 = parts[2].trim().parse().map(expand_two_digit_year).ok()?;
        return Date::from_calendar_date(year, month, day).ok();
    }

    let first: i64 = parts[0].trim().parse().ok()?;
    let second: i64 = parts[1].trim().parse().ok()?;
    let third: i64 = parts[2].trim().parse().ok()?;

    if parts[0].trim().len() == 4 {
        // ISO year first
        return calendar_date(
            i32::try_from(first).ok()?,
            u8::try_from(second).ok()?,
            u8::try_from(third).ok()?,
        );
    }

    // US month first, two- or four-digit year
    calendar_date(
        expand_two_digit_year(i32::try_from(third).ok()?),
        u8::try_from(first).ok()?,
        u8::try_from(second).ok()?,
    )
}

fn parse_spelled_date(input: &str) -> Option<Date> {
    let tokens: Vec<&str> = input
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|token| !token.is_empty())
        .collect();

    let month_index = tokens.iter().position(|token| month_from_name(token).is_some())?;
    let month = month_from_name(tokens[month_index])?;

    let mut day = None;
    let mut year = None;
    for token in tokens.iter().skip(month_index + 1) {
        let cleaned = token.trim_start_matches('\'');
        let Ok(value) = cleaned.parse::<i32>() else {
            continue;
        };
        if day.is_none() && (1..=31).contains(&value) && cleaned.len() <= 2 {
            day = Some(value);
        } else if year.is_none() {
            year = Some(expand_two_digit_year(value));
        }
        if day.is_some() && year.is_some() {
            break;
        }
    }

    Date::from_calendar_date(year?, month, u8::try_from(day?).ok()?).ok()
}

/// Parse a money amount tolerating `$`, thousands separators, surrounding
/// whitespace, and accounting-style `(1.23)` negatives.
pub fn parse_money(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let negative_parens = trimmed.starts_with('(') && trimmed.ends_with(')');
    let cleaned: String = trimmed
        .trim_start_matches('(')
        .trim_end_matches(')')
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' '))
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negative_parens { -value } else { value })
}

/// Parse a contract quantity, tolerating sign, decimals that round to a
/// whole number, and accounting negatives. Returns a signed count.
pub fn parse_quantity(input: &str) -> Option<i64> {
    let value = parse_money(input)?;
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded == 0.0 {
        return None;
    }
    Some(rounded as i64)
}

/// Decode a compact option code: ticker + YYMMDD + C/P + strike.
///
/// Accepts the fixed-width form with an 8-digit strike in thousandths
/// (`AAPL231215C00150000`) and the short form with a plain strike
/// (`-AAPL231215C150`, Fidelity's leading dash included).
pub fn decode_compact_code(input: &str) -> Option<OptionLeg> {
    let cleaned: String = input
        .trim()
        .trim_start_matches('-')
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    let ticker_len = cleaned.chars().take_while(|ch| ch.is_ascii_alphabetic()).count();
    if !(1..=6).contains(&ticker_len) {
        return None;
    }
    let (ticker, rest) = cleaned.split_at(ticker_len);

    if rest.len() < 8 {
        return None;
    }
    let (date_part, rest) = rest.split_at(6);
    if !date_part.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }

    let year: i32 = date_part[0..2].parse().ok()?;
    let month: u8 = date_part[2..4].parse().ok()?;
    let day: u8 = date_part[4..6].parse().ok()?;
    let expiration = calendar_date(2000 + year, month, day)?;

    let mut rest_chars = rest.chars();
    let option_type = match rest_chars.next()? {
        'C' => OptionType::Call,
        'P' => OptionType::Put,
        _ => return None,
    };

    let strike_part: &str = &rest[1..];
    let strike = if strike_part.len() == 8 && strike_part.chars().all(|ch| ch.is_ascii_digit()) {
        // OCC fixed width: strike in 1/1000 dollars, zero padded.
        let thousandths: i64 = strike_part.parse().ok()?;
        thousandths as f64 / 1000.0
    } else {
        strike_part.parse::<f64>().ok()?
    };

    if !(strike.is_finite() && strike > 0.0) {
        return None;
    }

    Some(OptionLeg {
        ticker: ticker.to_owned(),
        option_type,
        strike,
        expiration,
    })
}

/// Decode an option identity from a free-text description such as
/// `AAPL 12/15/2023 Call $150.00` or `TSLA Dec 15 '23 $200 Put`.
pub fn decode_description(input: &str) -> Option<OptionLeg> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    let option_type = tokens.iter().find_map(|token| {
        match token.trim_matches(|ch: char| !ch.is_ascii_alphabetic()).to_ascii_lowercase().as_str() {
            "call" => Some(OptionType::Call),
            "put" => Some(OptionType::Put),
            _ => None,
        }
    })?;

    // Fidelity-style descriptions lead with the right: "CALL (AAPL) ...".
    let first_lower = tokens[0].to_ascii_lowercase();
    let ticker_token = if first_lower == "call" || first_lower == "put" {
        *tokens.get(1)?
    } else {
        tokens[0]
    };
    let ticker: String = ticker_token
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if ticker.is_empty() || !ticker.chars().next().is_some_and(|ch| ch.is_ascii_alphabetic()) {
        return None;
    }

    // Expiration: either one token that parses as a date, or a spelled-out
    // month-name window.
    let mut expiration = None;
    for token in &tokens[1..] {
        if token.contains('/') || (token.contains('-') && token.len() >= 8) {
            if let Some(date) = parse_date(token) {
                expiration = Some(date);
                break;
            }
        }
    }
    if expiration.is_none() {
        expiration = parse_spelled_date(&tokens[1..].join(" "));
    }
    let expiration = expiration?;

    // Strike: prefer an explicit dollar token, otherwise the last
    // standalone decimal that is not part of the date.
    let mut strike = None;
    for token in tokens.iter().rev() {
        if token.starts_with('$') {
            strike = parse_money(token);
            break;
        }
    }
    if strike.is_none() {
        for token in tokens.iter().rev() {
            if token.contains('/') || token.contains('-') || month_from_name(token).is_some() {
                continue;
            }
            if token.contains('.') {
                if let Some(value) = parse_money(token) {
                    strike = Some(value);
                    break;
                }
            }
        }
    }
    let strike = strike.filter(|value| *value > 0.0)?;

    Some(OptionLeg {
        ticker,
        option_type,
        strike,
        expiration,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn decodes_occ_fixed_width_code() {
        let leg = decode_compact_code("AAPL231215C00150000").expect("decode");
        assert_eq!(leg.ticker, "AAPL");
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.expiration, date!(2023 - 12 - 15));
        assert!((leg.strike - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_fidelity_short_code_with_leading_dash() {
        let leg = decode_compact_code("-TSLA240119P200").expect("decode");
        assert_eq!(leg.ticker, "TSLA");
        assert_eq!(leg.option_type, OptionType::Put);
        assert_eq!(leg.expiration, date!(2024 - 01 - 19));
        assert!((leg.strike - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_fractional_occ_strike() {
        let leg = decode_compact_code("F231215C00012500").expect("decode");
        assert!((leg.strike - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_option_codes() {
        assert!(decode_compact_code("AAPL").is_none());
        assert!(decode_compact_code("231215C00150000").is_none());
        assert!(decode_compact_code("AAPL231315C00150000").is_none());
    }

    #[test]
    fn decodes_slash_date_description() {
        let leg = decode_description("AAPL 12/15/2023 Call $150.00").expect("decode");
        assert_eq!(leg.ticker, "AAPL");
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.expiration, date!(2023 - 12 - 15));
        assert!((leg.strike - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_month_name_description() {
        let leg = decode_description("TSLA Dec 15 '23 $200 Put").expect("decode");
        assert_eq!(leg.ticker, "TSLA");
        assert_eq!(leg.option_type, OptionType::Put);
        assert_eq!(leg.expiration, date!(2023 - 12 - 15));
        assert!((leg.strike - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decodes_right_first_description() {
        let leg = decode_description("CALL (AAPL) APPLE INC DEC 15 23 $150 (100 SHS)")
            .expect("decode");
        assert_eq!(leg.ticker, "AAPL");
        assert_eq!(leg.option_type, OptionType::Call);
        assert_eq!(leg.expiration, date!(2023 - 12 - 15));
        assert!((leg.strike - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn description_without_option_keyword_is_rejected() {
        assert!(decode_description("AAPL market buy 100 shares").is_none());
    }

    #[test]
    fn parses_money_shapes() {
        assert_eq!(parse_money("$1,234.56"), Some(1234.56));
        assert_eq!(parse_money("(1.25)"), Some(-1.25));
        assert_eq!(parse_money(" -0.65 "), Some(-0.65));
        assert!(parse_money("n/a").is_none());
    }

    #[test]
    fn parses_quantity_shapes() {
        assert_eq!(parse_quantity("2"), Some(2));
        assert_eq!(parse_quantity("-3.0"), Some(-3));
        assert_eq!(parse_quantity("(1)"), Some(-1));
        assert!(parse_quantity("0").is_none());
        assert!(parse_quantity("1.5").is_none());
    }

    #[test]
    fn parses_date_shapes() {
        assert_eq!(parse_date("2023-12-15"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("12/15/2023"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("12/15/23"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("20231215"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("Dec 15, 2023"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("15-Dec-2023"), Some(date!(2023 - 12 - 15)));
        assert_eq!(parse_date("2023-12-15 09:30:00"), Some(date!(2023 - 12 - 15)));
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn parses_spreadsheet_serial() {
        // 45275 days after 1899-12-30 is 2023-12-15.
        assert_eq!(parse_date("45275"), Some(date!(2023 - 12 - 15)));
        assert!(parse_date("12").is_none());
    }
}
