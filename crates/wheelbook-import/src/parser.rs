//! Tolerant tabular parsing for broker CSV exports.
//!
//! Broker exports are messy: unlabeled delimiters, ragged rows, stray BOMs,
//! occasionally a file saved in the wrong encoding. The parser classifies
//! problems as **critical** (structural corruption, the whole parse aborts)
//! or **tolerable** (a ragged row is logged and skipped, parsing continues).

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Delimiters considered by auto-detection.
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Source byte encoding override for file input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceEncoding {
    #[default]
    Utf8,
    Latin1,
}

/// One parsed CSV line as a header -> value map. Empty cells are dropped.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    line: u64,
    values: HashMap<String, String>,
}

impl RawRow {
    pub fn new(line: u64) -> Self {
        Self {
            line,
            values: HashMap::new(),
        }
    }

    /// 1-based source line this row came from.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn insert(&mut self, header: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.trim().is_empty() {
            self.values.insert(header.into(), value);
        }
    }

    /// Exact-header lookup.
    pub fn get(&self, header: &str) -> Option<&str> {
        self.values.get(header).map(String::as_str)
    }

    /// Case/punctuation-insensitive, substring-tolerant header lookup.
    pub fn get_fuzzy(&self, wanted: &str) -> Option<&str> {
        let wanted_key = normalize_header(wanted);
        // Exact normalized match wins over substring containment.
        for (header, value) in &self.values {
            if normalize_header(header) == wanted_key {
                return Some(value.as_str());
            }
        }
        for (header, value) in &self.values {
            if normalize_header(header).contains(&wanted_key) {
                return Some(value.as_str());
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Header normalization shared by row lookup and format classification:
/// lowercase, ASCII alphanumerics only.
pub fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

/// Returns true when `header` fuzzily matches `wanted`.
pub fn header_matches(header: &str, wanted: &str) -> bool {
    let header = normalize_header(header);
    let wanted = normalize_header(wanted);
    header == wanted || header.contains(&wanted)
}

/// Tolerable problem recorded while parsing continued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub line: u64,
    pub message: String,
}

/// Result of a (possibly bounded) parse.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub delimiter: u8,
    pub tolerable_issues: Vec<ParseIssue>,
}

/// Pre-parse structural diagnosis with remediation suggestions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureReport {
    pub ok: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Count candidate delimiters in the header line and pick the most frequent.
/// Falls back to comma when the sample contains none of them.
pub fn detect_delimiter(text: &str) -> u8 {
    let sample = text.lines().next().unwrap_or("");
    CANDIDATE_DELIMITERS
        .into_iter()
        .map(|delim| (delim, sample.bytes().filter(|b| *b == delim).count()))
        .max_by_key(|(_, count)| *count)
        .filter(|(_, count)| *count > 0)
        .map_or(b',', |(delim, _)| delim)
}

/// Parse CSV text into headers and rows.
///
/// # Errors
///
/// Returns a critical [`ImportError`] for empty input, a missing header
/// line, or structural corruption the CSV reader cannot recover from.
pub fn parse_text(text: &str, delimiter: Option<u8>) -> Result<ParsedTable, ImportError> {
    parse_bounded(text, delimiter, None)
}

/// Parse only the first `limit` data rows; used by preview and detection.
pub fn preview(text: &str, delimiter: Option<u8>, limit: usize) -> Result<ParsedTable, ImportError> {
    parse_bounded(text, delimiter, Some(limit))
}

fn parse_bounded(
    text: &str,
    delimiter: Option<u8>,
    limit: Option<usize>,
) -> Result<ParsedTable, ImportError> {
    let text = text.trim_start_matches('\u{feff}');
    if text.trim().is_empty() {
        return Err(ImportError::parse_critical("input is empty"));
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|error| ImportError::parse_critical(format!("unreadable header line: {error}")))?
        .iter()
        .map(str::to_owned)
        .collect();

    if headers.iter().all(|header| header.trim().is_empty()) {
        return Err(ImportError::parse_critical("header line is empty"));
    }

    let mut rows = Vec::new();
    let mut tolerable_issues = Vec::new();

    for record in reader.records() {
        if let Some(limit) = limit {
            if rows.len() >= limit {
                break;
            }
        }

        let record = record.map_err(|error| {
            ImportError::parse_critical(format!("structural corruption: {error}"))
        })?;
        let line = record.position().map_or(0, |position| position.line());

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        if record.len() != headers.len() {
            let issue = ParseIssue {
                line,
                message: format!(
                    "expected {} fields but found {}; row skipped",
                    headers.len(),
                    record.len()
                ),
            };
            tracing::warn!(line = issue.line, message = %issue.message, "tolerable parse error");
            tolerable_issues.push(issue);
            continue;
        }

        let mut row = RawRow::new(line);
        for (header, value) in headers.iter().zip(record.iter()) {
            row.insert(header.clone(), value);
        }
        if !row.is_empty() {
            rows.push(row);
        }
    }

    Ok(ParsedTable {
        headers,
        rows,
        delimiter,
        tolerable_issues,
    })
}

/// Read a CSV file to text, honoring the encoding override and stripping
/// a UTF-8 BOM when present.
pub fn read_file(path: &Path, encoding: SourceEncoding) -> Result<String, ImportError> {
    let bytes = std::fs::read(path)?;
    let text = match encoding {
        SourceEncoding::Utf8 => String::from_utf8_lossy(&bytes).into_owned(),
        SourceEncoding::Latin1 => bytes.iter().map(|b| char::from(*b)).collect(),
    };
    Ok(text)
}

/// Inspect the input for structural problems before committing to a parse.
pub fn check_structure(text: &str, delimiter: Option<u8>) -> StructureReport {
    let text = text.trim_start_matches('\u{feff}');
    let mut report = StructureReport::default();

    if text.trim().is_empty() {
        report.issues.push(String::from("input is empty"));
        report
            .suggestions
            .push(String::from("export the CSV again; the file has no content"));
        return report;
    }

    if text.contains('\0') || text.contains('\u{fffd}') {
        report
            .issues
            .push(String::from("input contains NUL or replacement characters"));
        report.suggestions.push(String::from(
            "the file looks mis-encoded; re-export as UTF-8 or pass an encoding override",
        ));
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(text));
    let mut lines = text.lines();
    let header = lines.next().unwrap_or("");
    let header_fields = header.split(char::from(delimiter)).count();

    if header_fields < 2 {
        report.issues.push(String::from(
            "header line has a single column; delimiter may be wrong",
        ));
        report.suggestions.push(String::from(
            "pass an explicit delimiter (comma, semicolon, tab, or pipe)",
        ));
    }

    let digits = header.chars().filter(char::is_ascii_digit).count();
    let letters = header.chars().filter(char::is_ascii_alphabetic).count();
    if digits > letters {
        report
            .issues
            .push(String::from("first line looks like data, not a header"));
        report
            .suggestions
            .push(String::from("ensure the export includes a header row"));
    }

    let mut data_lines = 0usize;
    let mut ragged_lines = 0usize;
    for line in lines.take(200) {
        if line.trim().is_empty() {
            continue;
        }
        data_lines += 1;
        let fields = line.split(char::from(delimiter)).count();
        if fields != header_fields {
            ragged_lines += 1;
        }
    }

    if data_lines == 0 {
        report
            .issues
            .push(String::from("no data rows follow the header"));
        report
            .suggestions
            .push(String::from("the export contains headers only"));
    } else if ragged_lines > 0 {
        report.issues.push(format!(
            "{ragged_lines} of {data_lines} sampled rows have an inconsistent column count"
        ));
        report.suggestions.push(String::from(
            "fields containing the delimiter must be quoted; affected rows will be skipped",
        ));
    }

    report.ok = report.issues.is_empty();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_comma_semicolon_tab_and_pipe() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), b',');
        assert_eq!(detect_delimiter("a;b;c"), b';');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a|b|c"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn parses_headers_and_rows() {
        let table = parse_text("Symbol,Qty\nAAPL,2\nTSLA,1\n", None).expect("parse");
        assert_eq!(table.headers, vec!["Symbol", "Qty"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Symbol"), Some("AAPL"));
        assert!(table.tolerable_issues.is_empty());
    }

    #[test]
    fn ragged_row_is_tolerable_and_skipped() {
        let table = parse_text("Symbol,Qty\nAAPL,2\nTSLA,1,extra\nMSFT,3\n", None).expect("parse");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.tolerable_issues.len(), 1);
        assert_eq!(table.tolerable_issues[0].line, 3);
    }

    #[test]
    fn empty_input_is_critical() {
        let error = parse_text("  \n ", None).expect_err("must fail");
        assert_eq!(error.code(), "import.parse_critical");
    }

    #[test]
    fn strips_bom_before_parsing() {
        let table = parse_text("\u{feff}Symbol,Qty\nAAPL,1\n", None).expect("parse");
        assert_eq!(table.headers[0], "Symbol");
    }

    #[test]
    fn preview_bounds_row_count() {
        let table = preview("a,b\n1,2\n3,4\n5,6\n", None, 2).expect("parse");
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn fuzzy_row_lookup_ignores_case_and_punctuation() {
        let mut row = RawRow::new(2);
        row.insert("Fees & Comm", "1.30");
        assert_eq!(row.get_fuzzy("fees comm"), Some("1.30"));
        assert_eq!(row.get_fuzzy("fees"), Some("1.30"));
        assert!(row.get_fuzzy("commission rate").is_none());
    }

    #[test]
    fn structure_check_flags_missing_data_and_bad_delimiter() {
        let report = check_structure("just-a-header-line", None);
        assert!(!report.ok);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.contains("single column")));

        let report = check_structure("a,b\n1,2\n", None);
        assert!(report.ok);
    }

    #[test]
    fn structure_check_flags_garbled_encoding() {
        let report = check_structure("a,b\n1,\u{fffd}\n", None);
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.contains("replacement")));
    }
}
