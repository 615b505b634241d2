use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::broker::BrokerId;

/// Pipeline-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportErrorKind {
    ParseCritical,
    ValidationRejected,
    NoMatchingBroker,
    UnknownBroker,
    PortfolioNotFound,
    SymbolCreationInFlight,
    InvalidTicker,
    Cancelled,
    Storage,
    Io,
    Internal,
}

/// Structured pipeline error.
///
/// A `fatal` error aborts the whole import; non-fatal errors are recovered
/// per record and counted against the error budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportError {
    kind: ImportErrorKind,
    message: String,
    fatal: bool,
}

impl ImportError {
    pub fn parse_critical(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::ParseCritical,
            message: message.into(),
            fatal: true,
        }
    }

    pub fn validation_rejected(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::ValidationRejected,
            message: message.into(),
            fatal: true,
        }
    }

    pub fn no_matching_broker() -> Self {
        Self {
            kind: ImportErrorKind::NoMatchingBroker,
            message: String::from(
                "no registered broker format matches the CSV headers",
            ),
            fatal: true,
        }
    }

    pub fn unknown_broker(broker: BrokerId) -> Self {
        Self {
            kind: ImportErrorKind::UnknownBroker,
            message: format!("broker adapter '{broker}' is not registered"),
            fatal: true,
        }
    }

    pub fn portfolio_not_found(portfolio_id: impl Display) -> Self {
        Self {
            kind: ImportErrorKind::PortfolioNotFound,
            message: format!("portfolio {portfolio_id} does not exist"),
            fatal: true,
        }
    }

    pub fn symbol_creation_in_flight(ticker: impl Display) -> Self {
        Self {
            kind: ImportErrorKind::SymbolCreationInFlight,
            message: format!("creation already in flight for ticker '{ticker}'"),
            fatal: false,
        }
    }

    pub fn invalid_ticker(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::InvalidTicker,
            message: message.into(),
            fatal: false,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: ImportErrorKind::Cancelled,
            message: String::from("import cancelled"),
            fatal: true,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::Storage,
            message: message.into(),
            fatal: false,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::Io,
            message: message.into(),
            fatal: true,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ImportErrorKind::Internal,
            message: message.into(),
            fatal: true,
        }
    }

    pub const fn kind(&self) -> ImportErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn fatal(&self) -> bool {
        self.fatal
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ImportErrorKind::ParseCritical => "import.parse_critical",
            ImportErrorKind::ValidationRejected => "import.validation_rejected",
            ImportErrorKind::NoMatchingBroker => "import.no_matching_broker",
            ImportErrorKind::UnknownBroker => "import.unknown_broker",
            ImportErrorKind::PortfolioNotFound => "import.portfolio_not_found",
            ImportErrorKind::SymbolCreationInFlight => "import.symbol_creation_in_flight",
            ImportErrorKind::InvalidTicker => "import.invalid_ticker",
            ImportErrorKind::Cancelled => "import.cancelled",
            ImportErrorKind::Storage => "import.storage",
            ImportErrorKind::Io => "import.io",
            ImportErrorKind::Internal => "import.internal",
        }
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ImportError {}

impl From<wheelbook_warehouse::StoreError> for ImportError {
    fn from(error: wheelbook_warehouse::StoreError) -> Self {
        Self::storage(error.to_string())
    }
}

impl From<std::io::Error> for ImportError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

/// Row-level issue retained in reports for remediation UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordIssue {
    /// Zero-based row index within the parsed batch, when attributable.
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub code: String,
    pub message: String,
}

impl RecordIssue {
    pub fn new(
        index: Option<usize>,
        field: Option<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            field,
            code: code.into(),
            message: message.into(),
        }
    }
}
