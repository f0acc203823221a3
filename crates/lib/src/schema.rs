//! Star-schema construction from a cleaned batch.
//!
//! Surrogate keys are assigned deterministically within the batch: the first
//! occurrence of a natural key (calendar date, stock code, customer id)
//! claims the next key, later occurrences reuse it. Conflicting attribute
//! values for one natural key resolve last-seen-wins. The keys produced here
//! are batch-local; the loader remaps them onto warehouse keys inside the
//! load transaction so repeated runs never duplicate a dimension row.

use crate::types::{
    date_key, CleanedRecord, DimCustomerRow, DimDateRow, DimProductRow, FactSalesRow, StarSchema,
};
use std::collections::HashMap;
use tracing::info;

/// Builds the dimension and fact rows for one cleaned batch.
///
/// Every cleaned record resolves to all three dimension keys by
/// construction, so each input record yields exactly one fact row.
pub fn build_star_schema(records: &[CleanedRecord]) -> StarSchema {
    let mut star = StarSchema::default();
    let mut date_index: HashMap<i64, usize> = HashMap::new();
    let mut product_index: HashMap<String, usize> = HashMap::new();
    let mut customer_index: HashMap<i64, usize> = HashMap::new();

    for record in records {
        let date = record.invoice_date.date();
        let dk = date_key(date);
        if !date_index.contains_key(&dk) {
            date_index.insert(dk, star.dates.len());
            star.dates.push(DimDateRow::from_date(date));
        }

        let product_key = match product_index.get(&record.stock_code) {
            Some(&i) => {
                // Last-seen description wins on conflict.
                star.products[i].description = record.description.clone();
                star.products[i].product_key
            }
            None => {
                let key = star.products.len() as i64 + 1;
                product_index.insert(record.stock_code.clone(), star.products.len());
                star.products.push(DimProductRow {
                    product_key: key,
                    stock_code: record.stock_code.clone(),
                    description: record.description.clone(),
                });
                key
            }
        };

        let customer_key = match customer_index.get(&record.customer_id) {
            Some(&i) => {
                star.customers[i].country = record.country.clone();
                star.customers[i].customer_key
            }
            None => {
                let key = star.customers.len() as i64 + 1;
                customer_index.insert(record.customer_id, star.customers.len());
                star.customers.push(DimCustomerRow {
                    customer_key: key,
                    customer_id: record.customer_id,
                    country: record.country.clone(),
                });
                key
            }
        };

        star.facts.push(FactSalesRow {
            invoice_no: record.invoice_no.clone(),
            date_key: dk,
            product_key,
            customer_key,
            quantity: record.quantity,
            unit_price: record.unit_price,
            sales_amount: record.sales_amount,
        });
    }

    info!(
        "[schema] built star schema: {} dates, {} products, {} customers, {} facts",
        star.dates.len(),
        star.products.len(),
        star.customers.len(),
        star.facts.len()
    );
    star
}
