//! Broker format detection.
//!
//! Detection is a pure scoring function over the header set and each
//! adapter's declared columns, so results are deterministic and fully
//! explainable: every detection carries a rationale string and the list of
//! columns that matched.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapters::{
    BrokerAdapter, EtradeAdapter, FidelityAdapter, GenericAdapter, InteractiveBrokersAdapter,
    RobinhoodAdapter, SchwabAdapter,
};
use crate::broker::BrokerId;
use crate::error::ImportError;
use crate::parser::header_matches;

/// Confidence awarded when every required column is present.
const REQUIRED_BASE: f64 = 0.4;
/// Bonus per distinctive column found, capped at [`DISTINCTIVE_CAP`].
const DISTINCTIVE_BONUS: f64 = 0.15;
const DISTINCTIVE_CAP: f64 = 0.45;
/// Structural cue bonus for a free-text description column.
const DESCRIPTION_BONUS: f64 = 0.05;

/// Outcome of scoring one adapter against a header set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerDetection {
    pub broker: BrokerId,
    pub confidence: f64,
    pub rationale: String,
    pub required_columns: Vec<String>,
    pub columns_found: Vec<String>,
}

pub(crate) struct HeaderScore {
    pub confidence: f64,
    pub rationale: String,
    pub columns_found: Vec<String>,
}

/// Score an adapter's declared columns against a header set.
pub(crate) fn score_headers(headers: &[String], adapter: &dyn BrokerAdapter) -> HeaderScore {
    let find = |wanted: &str| -> Option<&String> {
        headers.iter().find(|header| header_matches(header, wanted))
    };

    let mut columns_found = Vec::new();
    let mut missing = Vec::new();
    for wanted in adapter.required_columns() {
        match find(wanted) {
            Some(header) => columns_found.push(header.clone()),
            None => missing.push(*wanted),
        }
    }

    if !missing.is_empty() {
        return HeaderScore {
            confidence: 0.0,
            rationale: format!("missing required columns: {}", missing.join(", ")),
            columns_found,
        };
    }

    let mut confidence = REQUIRED_BASE;
    let mut rationale = format!(
        "all {} required columns present",
        adapter.required_columns().len()
    );

    let mut distinctive_found = Vec::new();
    for wanted in adapter.distinctive_columns() {
        if let Some(header) = find(wanted) {
            distinctive_found.push(*wanted);
            if !columns_found.contains(header) {
                columns_found.push(header.clone());
            }
        }
    }
    if !distinctive_found.is_empty() {
        let bonus =
            (DISTINCTIVE_BONUS * distinctive_found.len() as f64).min(DISTINCTIVE_CAP);
        confidence += bonus;
        rationale.push_str(&format!(
            "; {} distinctive columns matched ({})",
            distinctive_found.len(),
            distinctive_found.join(", ")
        ));
    }

    if let Some(description) = adapter.description_column() {
        if find(description).is_some() {
            confidence += DESCRIPTION_BONUS;
            rationale.push_str("; free-text description column present");
        }
    }

    for wanted in adapter.optional_columns() {
        if let Some(header) = find(wanted) {
            if !columns_found.contains(header) {
                columns_found.push(header.clone());
            }
        }
    }

    HeaderScore {
        confidence: confidence.clamp(0.0, 1.0),
        rationale,
        columns_found,
    }
}

/// Registry of broker adapters, one per supported format.
///
/// Registration order is the tie-break order for equal confidence scores;
/// the generic fallback is registered last.
pub struct FormatClassifier {
    adapters: Vec<Arc<dyn BrokerAdapter>>,
}

impl Default for FormatClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatClassifier {
    pub fn new() -> Self {
        Self {
            adapters: vec![
                Arc::new(RobinhoodAdapter),
                Arc::new(SchwabAdapter),
                Arc::new(FidelityAdapter),
                Arc::new(EtradeAdapter),
                Arc::new(InteractiveBrokersAdapter),
                Arc::new(GenericAdapter),
            ],
        }
    }

    pub fn adapters(&self) -> &[Arc<dyn BrokerAdapter>] {
        &self.adapters
    }

    /// Look up the adapter for a broker tag; used by the forced-broker
    /// override, which bypasses detection but still requires a registered
    /// adapter.
    pub fn adapter(&self, broker: BrokerId) -> Result<Arc<dyn BrokerAdapter>, ImportError> {
        self.adapters
            .iter()
            .find(|adapter| adapter.broker() == broker)
            .cloned()
            .ok_or_else(|| ImportError::unknown_broker(broker))
    }

    /// Score every adapter and return the single best match, or `None`
    /// when every adapter scores zero.
    pub fn detect(&self, headers: &[String]) -> Option<BrokerDetection> {
        let mut best: Option<BrokerDetection> = None;
        for detection in self.score_all(headers) {
            let better = match &best {
                Some(current) => detection.confidence > current.confidence,
                None => detection.confidence > 0.0,
            };
            if better {
                best = Some(detection);
            }
        }
        best
    }

    /// Diagnostic variant: every adapter's score, in registration order.
    pub fn score_all(&self, headers: &[String]) -> Vec<BrokerDetection> {
        self.adapters
            .iter()
            .map(|adapter| {
                let score = score_headers(headers, adapter.as_ref());
                BrokerDetection {
                    broker: adapter.broker(),
                    confidence: score.confidence,
                    rationale: score.rationale,
                    required_columns: adapter
                        .required_columns()
                        .iter()
                        .map(|column| (*column).to_owned())
                        .collect(),
                    columns_found: score.columns_found,
                }
            })
            .collect()
    }
}
