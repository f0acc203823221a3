//! Publication of the processed star-schema tables back to object storage.
//!
//! After a successful load, the four tables built for the run are written
//! out as CSV under a prefix (`cleaned_data/` by default) so the batch can
//! be audited or replayed without touching the warehouse.

use crate::store::{ObjectStore, StoreError};
use crate::types::StarSchema;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Errors raised while serializing or writing the processed output.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("failed to serialize table to CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV buffer: {0}")]
    Buffer(String),
    #[error("failed to write processed object: {0}")]
    Store(#[from] StoreError),
}

/// Writes the star-schema tables to the object store as
/// `{prefix}/{DimDate,DimProduct,DimCustomer,FactSales}.csv`.
pub async fn publish_star_schema(
    store: &dyn ObjectStore,
    star: &StarSchema,
    prefix: &str,
) -> Result<(), PublishError> {
    put_table(store, prefix, "DimDate", &star.dates).await?;
    put_table(store, prefix, "DimProduct", &star.products).await?;
    put_table(store, prefix, "DimCustomer", &star.customers).await?;
    put_table(store, prefix, "FactSales", &star.facts).await?;
    Ok(())
}

async fn put_table<T: Serialize>(
    store: &dyn ObjectStore,
    prefix: &str,
    name: &str,
    rows: &[T],
) -> Result<(), PublishError> {
    let bytes = to_csv(rows)?;
    let key = format!("{prefix}/{name}.csv");
    store.put(&key, &bytes).await?;
    info!("[publish] wrote {} rows to {key}", rows.len());
    Ok(())
}

fn to_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>, PublishError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PublishError::Buffer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DimProductRow;

    #[test]
    fn csv_output_has_headers_and_rows() {
        let rows = vec![
            DimProductRow {
                product_key: 1,
                stock_code: "85123A".to_string(),
                description: "WHITE HANGING HEART".to_string(),
            },
            DimProductRow {
                product_key: 2,
                stock_code: "71053".to_string(),
                description: "WHITE METAL LANTERN".to_string(),
            },
        ];
        let bytes = to_csv(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("product_key,stock_code,description"));
        assert_eq!(lines.next(), Some("1,85123A,WHITE HANGING HEART"));
        assert_eq!(lines.count(), 1);
    }
}
