//! Extraction of raw sales records from a tabular source object.
//!
//! The extractor is read-only: it parses the bytes fetched from object
//! storage into [`RawSalesRecord`]s and verifies that the required columns
//! are present. Row-level problems (unparseable numbers, short rows) never
//! abort extraction; those rows are carried through with unparsed fields and
//! the cleaner discards them with an accounted reason.

use crate::types::RawSalesRecord;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while parsing the raw extract.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("failed to parse source as CSV: {0}")]
    Parse(#[from] csv::Error),
    #[error("required columns missing from source: {0}")]
    SchemaMismatch(String),
}

/// The source columns the transform depends on, in sanitized form.
const REQUIRED_COLUMNS: [&str; 8] = [
    "invoiceno",
    "stockcode",
    "description",
    "quantity",
    "invoicedate",
    "unitprice",
    "customerid",
    "country",
];

/// Parses the raw extract bytes into a sequence of [`RawSalesRecord`]s.
///
/// Header names are matched after sanitization (trimmed, lowercased,
/// non-alphanumerics stripped), so `Invoice No` and `InvoiceNo` resolve to
/// the same column. Missing columns fail the run with
/// [`ExtractError::SchemaMismatch`] naming every absent column.
pub fn parse_raw_records(bytes: &[u8]) -> Result<Vec<RawSalesRecord>, ExtractError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = reader.headers()?.clone();

    let sanitized: Vec<String> = headers.iter().map(sanitize_header).collect();
    debug!("[extract] sanitized headers: {sanitized:?}");

    let mut indexes = [0usize; REQUIRED_COLUMNS.len()];
    let mut missing = Vec::new();
    for (slot, name) in indexes.iter_mut().zip(REQUIRED_COLUMNS) {
        match sanitized.iter().position(|h| h == name) {
            Some(i) => *slot = i,
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(ExtractError::SchemaMismatch(missing.join(", ")));
    }
    let [invoice_no, stock_code, description, quantity, invoice_date, unit_price, customer_id, country] =
        indexes;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let field = |i: usize| row.get(i).unwrap_or("").trim().to_string();
        records.push(RawSalesRecord {
            invoice_no: field(invoice_no),
            stock_code: field(stock_code),
            description: field(description),
            quantity: field(quantity).parse().ok(),
            invoice_date: field(invoice_date),
            unit_price: field(unit_price).parse().ok(),
            customer_id: field(customer_id),
            country: field(country),
        });
    }

    info!("[extract] parsed {} raw rows from source", records.len());
    Ok(records)
}

/// Normalizes a header for column matching.
fn sanitize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace(|c: char| !c.is_alphanumeric(), "")
}
