//! Validation and normalization of raw sales records.
//!
//! Cleaning is a pure function over the extracted batch: it never touches
//! I/O and never mutates its input. Rows that represent returns or
//! cancellations (non-positive quantity or price, blank invoice number) are
//! discarded and counted per reason so the run summary can report them.

use crate::types::{CleanedRecord, RawSalesRecord, UNKNOWN_CUSTOMER_ID, UNKNOWN_PRODUCT_DESCRIPTION};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::info;

/// Per-reason counts of rows the cleaner discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscardStats {
    /// Quantity missing, unparseable, or ≤ 0 (returns per source convention).
    pub non_positive_quantity: u64,
    /// Unit price missing, unparseable, or ≤ 0.
    pub non_positive_price: u64,
    /// Blank invoice number (cancellations per source convention).
    pub missing_invoice: u64,
    /// Invoice date that matched none of the supported formats.
    pub unparseable_date: u64,
}

impl DiscardStats {
    pub fn total(&self) -> u64 {
        self.non_positive_quantity
            + self.non_positive_price
            + self.missing_invoice
            + self.unparseable_date
    }
}

/// The result of cleaning one extracted batch.
#[derive(Debug, Clone, Default)]
pub struct CleanOutcome {
    pub records: Vec<CleanedRecord>,
    pub discarded: DiscardStats,
}

/// Invoice timestamp formats observed in retail exports, tried in order.
const DATE_TIME_FORMATS: [&str; 3] = ["%m/%d/%Y %H:%M", "%m/%d/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Validates and normalizes a batch of raw records.
///
/// Each surviving record gets a typed timestamp, the unknown-customer
/// sentinel for blank customer ids, a default description for blank
/// descriptions, and a precomputed `sales_amount`.
pub fn clean_records(raw: Vec<RawSalesRecord>) -> CleanOutcome {
    let extracted = raw.len();
    let mut outcome = CleanOutcome::default();

    for record in raw {
        if record.invoice_no.is_empty() {
            outcome.discarded.missing_invoice += 1;
            continue;
        }
        let quantity = match record.quantity {
            Some(q) if q > 0 => q,
            _ => {
                outcome.discarded.non_positive_quantity += 1;
                continue;
            }
        };
        let unit_price = match record.unit_price {
            Some(p) if p > 0.0 => p,
            _ => {
                outcome.discarded.non_positive_price += 1;
                continue;
            }
        };
        let invoice_date = match parse_invoice_date(&record.invoice_date) {
            Some(dt) => dt,
            None => {
                outcome.discarded.unparseable_date += 1;
                continue;
            }
        };

        let customer_id = if record.customer_id.is_empty() {
            UNKNOWN_CUSTOMER_ID
        } else {
            record
                .customer_id
                .parse()
                .unwrap_or(UNKNOWN_CUSTOMER_ID)
        };
        let description = if record.description.is_empty() {
            UNKNOWN_PRODUCT_DESCRIPTION.to_string()
        } else {
            record.description
        };

        outcome.records.push(CleanedRecord {
            sales_amount: quantity as f64 * unit_price,
            invoice_no: record.invoice_no,
            stock_code: record.stock_code,
            description,
            quantity,
            invoice_date,
            unit_price,
            customer_id,
            country: record.country,
        });
    }

    info!(
        "[clean] kept {} of {} rows ({} discarded)",
        outcome.records.len(),
        extracted,
        outcome.discarded.total()
    );
    outcome
}

/// Parses an invoice timestamp, trying datetime formats first and falling
/// back to bare dates at midnight.
fn parse_invoice_date(field: &str) -> Option<NaiveDateTime> {
    for fmt in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(field, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(field, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
