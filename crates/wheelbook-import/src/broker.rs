use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Canonical broker identifiers for the supported CSV formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerId {
    Robinhood,
    Schwab,
    Fidelity,
    Etrade,
    InteractiveBrokers,
    Generic,
}

impl BrokerId {
    pub const ALL: [Self; 6] = [
        Self::Robinhood,
        Self::Schwab,
        Self::Fidelity,
        Self::Etrade,
        Self::InteractiveBrokers,
        Self::Generic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Robinhood => "robinhood",
            Self::Schwab => "schwab",
            Self::Fidelity => "fidelity",
            Self::Etrade => "etrade",
            Self::InteractiveBrokers => "interactive_brokers",
            Self::Generic => "generic",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Robinhood => "Robinhood",
            Self::Schwab => "Charles Schwab",
            Self::Fidelity => "Fidelity",
            Self::Etrade => "E*TRADE",
            Self::InteractiveBrokers => "Interactive Brokers",
            Self::Generic => "Generic CSV",
        }
    }
}

impl Display for BrokerId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerId {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "robinhood" => Ok(Self::Robinhood),
            "schwab" => Ok(Self::Schwab),
            "fidelity" => Ok(Self::Fidelity),
            "etrade" | "e*trade" => Ok(Self::Etrade),
            "interactive_brokers" | "ibkr" => Ok(Self::InteractiveBrokers),
            "generic" => Ok(Self::Generic),
            other => Err(ImportError::internal(format!(
                "unrecognized broker tag '{other}'"
            ))),
        }
    }
}
