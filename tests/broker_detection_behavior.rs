//! Behavior tests for broker format detection over realistic CSV text.

use wheelbook_import::parser::{detect_delimiter, parse_text};
use wheelbook_import::{BrokerId, FormatClassifier};
use wheelbook_tests::{ROBINHOOD_CSV, SCHWAB_CSV};

const FIDELITY_CSV: &str = "\
Run Date,Action,Symbol,Description,Type,Quantity,Price ($),Commission ($),Fees ($),Amount ($),Settlement Date
11/01/2023,YOU SOLD OPENING TRANSACTION,-AAPL231215C150,CALL (AAPL) APPLE INC DEC 15 23 $150 (100 SHS),Margin,-2,1.25,0.65,0.04,249.31,11/02/2023
";

const ETRADE_CSV: &str = "\
TransactionDate,TransactionType,SecurityType,Symbol,Quantity,Amount,Price,Commission,Description
11/01/2023,Sold To Open,OPTN,AAPL Dec 15 '23 $150 Call,1,130.00,1.30,0.50,AAPL Dec 15 '23 $150 Call
";

const IBKR_CSV: &str = "\
Asset Category,Currency,Symbol,Date/Time,Quantity,T. Price,Proceeds,Comm/Fee,Buy/Sell
Equity and Index Options,USD,AAPL 231215C00150000,\"2023-11-01, 09:31:12\",-2,1.25,250,-1.10,SELL
";

const SEMICOLON_GENERIC_CSV: &str = "\
Symbol;Date;Action;Quantity;Price;Strike;Expiration;Type
AAPL;2023-11-01;STO;1;1.25;150;2023-12-15;call
";

fn detect(csv: &str) -> (BrokerId, f64) {
    let table = parse_text(csv, None).expect("parse");
    let detection = FormatClassifier::new()
        .detect(&table.headers)
        .expect("detection");
    (detection.broker, detection.confidence)
}

#[test]
fn each_supported_broker_is_detected_with_high_confidence() {
    let cases = [
        (ROBINHOOD_CSV, BrokerId::Robinhood),
        (SCHWAB_CSV, BrokerId::Schwab),
        (FIDELITY_CSV, BrokerId::Fidelity),
        (ETRADE_CSV, BrokerId::Etrade),
        (IBKR_CSV, BrokerId::InteractiveBrokers),
    ];

    for (csv, expected) in cases {
        let (broker, confidence) = detect(csv);
        assert_eq!(broker, expected);
        assert!(confidence >= 0.7, "{expected:?} scored {confidence}");
    }
}

#[test]
fn a_hand_built_sheet_falls_back_to_the_generic_adapter() {
    // Explicit Strike/Expiration/Type columns appear together in no real
    // broker export, so they mark the sheet as hand-built.
    let (broker, confidence) = detect(
        "Symbol,Date,Action,Quantity,Price,Strike,Expiration,Type\nAAPL,2023-11-01,STO,1,1.25,150,2023-12-15,call\n",
    );
    assert_eq!(broker, BrokerId::Generic);
    assert!(confidence >= 0.7, "got {confidence}");
}

#[test]
fn delimiter_sniffing_handles_semicolon_sheets() {
    assert_eq!(detect_delimiter(SEMICOLON_GENERIC_CSV), b';');
    let (broker, _) = detect(SEMICOLON_GENERIC_CSV);
    assert_eq!(broker, BrokerId::Generic);
}

#[test]
fn detection_survives_header_case_and_spacing_differences() {
    let csv = "\
activity date,instrument,description,TRANS CODE,quantity,price,settle date
11/01/2023,AAPL,AAPL 12/15/2023 Call $150.00,STO,2,$1.25,11/02/2023
";
    let (broker, confidence) = detect(csv);
    assert_eq!(broker, BrokerId::Robinhood);
    assert!(confidence >= 0.7);
}

#[test]
fn every_adapter_is_scored_for_diagnostics() {
    let table = parse_text(ROBINHOOD_CSV, None).expect("parse");
    let scores = FormatClassifier::new().score_all(&table.headers);
    assert_eq!(scores.len(), BrokerId::ALL.len());
    let robinhood = scores
        .iter()
        .find(|score| score.broker == BrokerId::Robinhood)
        .expect("robinhood scored");
    assert!(scores
        .iter()
        .all(|score| score.confidence <= robinhood.confidence));
}
