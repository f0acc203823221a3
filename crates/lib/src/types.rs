//! Core data types for the sales ETL pipeline.
//!
//! The flow of types mirrors the stages of the pipeline: a `RawSalesRecord`
//! comes out of the extractor as-is, a `CleanedRecord` has passed validation
//! and normalization, and the `StarSchema` holds the dimension and fact rows
//! derived from a cleaned batch.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// The customer id assigned to sales with a blank `CustomerID` field.
pub const UNKNOWN_CUSTOMER_ID: i64 = -1;

/// The description assigned to products with a blank `Description` field.
pub const UNKNOWN_PRODUCT_DESCRIPTION: &str = "unknown product";

/// One row of the raw sales extract, exactly as read from the source file.
///
/// Nothing is guaranteed here: numeric fields that failed to parse are
/// `None`, identifiers may be blank, and the invoice date is still the raw
/// source string. The cleaner decides what survives.
#[derive(Debug, Clone, Default)]
pub struct RawSalesRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: Option<i64>,
    pub invoice_date: String,
    pub unit_price: Option<f64>,
    pub customer_id: String,
    pub country: String,
}

/// A validated, normalized sales line item.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub invoice_date: NaiveDateTime,
    pub unit_price: f64,
    /// Normalized customer id; [`UNKNOWN_CUSTOMER_ID`] for anonymous sales.
    pub customer_id: i64,
    pub country: String,
    /// Always `quantity as f64 * unit_price`.
    pub sales_amount: f64,
}

/// A row of the date dimension, keyed by the `yyyymmdd` smart key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimDateRow {
    pub date_key: i64,
    pub full_date: NaiveDate,
    pub day: u32,
    pub month: u32,
    pub quarter: u32,
    pub year: i32,
    pub weekday: String,
}

impl DimDateRow {
    /// Derives the full date-dimension row for a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        use chrono::Datelike;
        let month = date.month();
        Self {
            date_key: date_key(date),
            full_date: date,
            day: date.day(),
            month,
            quarter: (month - 1) / 3 + 1,
            year: date.year(),
            weekday: date.format("%A").to_string(),
        }
    }
}

/// The `yyyymmdd` smart key for a calendar date.
pub fn date_key(date: NaiveDate) -> i64 {
    use chrono::Datelike;
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

/// A row of the product dimension. `product_key` is batch-local until the
/// loader resolves it against the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimProductRow {
    pub product_key: i64,
    pub stock_code: String,
    pub description: String,
}

/// A row of the customer dimension. `customer_key` is batch-local until the
/// loader resolves it against the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimCustomerRow {
    pub customer_key: i64,
    pub customer_id: i64,
    pub country: String,
}

/// One fact row. The product and customer keys reference rows of the
/// [`StarSchema`] that produced this fact; the date key is the `yyyymmdd`
/// smart key and is identical in the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactSalesRow {
    pub invoice_no: String,
    pub date_key: i64,
    pub product_key: i64,
    pub customer_key: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub sales_amount: f64,
}

/// The in-memory star schema built from one cleaned batch.
///
/// Surrogate keys are assigned deterministically within the batch: the first
/// occurrence of a natural key claims the next key, later occurrences reuse
/// it. The loader remaps these batch keys onto warehouse keys at load time.
#[derive(Debug, Clone, Default)]
pub struct StarSchema {
    pub dates: Vec<DimDateRow>,
    pub products: Vec<DimProductRow>,
    pub customers: Vec<DimCustomerRow>,
    pub facts: Vec<FactSalesRow>,
}
