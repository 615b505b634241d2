use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_TICKER_LEN: usize = 10;

/// Normalized ticker for a symbol-master record.
///
/// Tickers are 1-10 uppercase ASCII alphanumeric characters. Broker CSVs
/// carry tickers in mixed case with punctuation (`BRK.B`, ` aapl `), so
/// callers choose between strict [`Ticker::parse`] and lossy
/// [`Ticker::normalize_lossy`] depending on configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// Parse a ticker, uppercasing but rejecting anything non-alphanumeric.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTicker);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_TICKER_LEN {
            return Err(ValidationError::TickerTooLong {
                len,
                max: MAX_TICKER_LEN,
            });
        }

        for (index, ch) in normalized.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::TickerInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    /// Normalize a ticker by uppercasing, stripping non-alphanumeric
    /// characters, and truncating to the maximum length.
    ///
    /// Returns `None` when nothing alphanumeric survives.
    pub fn normalize_lossy(input: &str) -> Option<Self> {
        let normalized: String = input
            .trim()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_uppercase())
            .take(MAX_TICKER_LEN)
            .collect();

        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Ticker {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Ticker {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_ticker() {
        let parsed = Ticker::parse(" aapl ").expect("ticker should parse");
        assert_eq!(parsed.as_str(), "AAPL");
    }

    #[test]
    fn rejects_punctuation() {
        let err = Ticker::parse("BRK.B").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerInvalidChar { .. }));
    }

    #[test]
    fn rejects_overlong_ticker() {
        let err = Ticker::parse("ABCDEFGHIJK").expect_err("must fail");
        assert!(matches!(err, ValidationError::TickerTooLong { .. }));
    }

    #[test]
    fn lossy_normalization_strips_and_truncates() {
        let ticker = Ticker::normalize_lossy(" brk.b ").expect("should survive");
        assert_eq!(ticker.as_str(), "BRKB");

        let long = Ticker::normalize_lossy("ABCDEFGHIJKLMNO").expect("should survive");
        assert_eq!(long.as_str(), "ABCDEFGHIJ");

        assert!(Ticker::normalize_lossy("$$$").is_none());
    }
}
