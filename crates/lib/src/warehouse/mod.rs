//! Warehouse provider and transactional star-schema loader.
//!
//! The warehouse is an external SQL store reached through Turso. The
//! provider holds a `Database` instance (a connection pool); every operation
//! takes its own connection. When cloned it shares the same underlying
//! database, so an in-memory instance can be shared across a test by
//! cloning the provider.

use crate::types::StarSchema;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};
use turso::{params, Connection, Database, Value as TursoValue};

pub mod sql;

/// Errors raised by warehouse operations. Any error inside the load
/// transaction rolls the whole run back.
#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("failed to get warehouse connection: {0}")]
    Connection(String),
    #[error("warehouse error: {0}")]
    Database(#[from] turso::Error),
    #[error("failed to serialize query result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Row counts from one committed load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub dates_inserted: u64,
    pub products_upserted: u64,
    pub customers_upserted: u64,
    pub facts_inserted: u64,
    /// Facts skipped because their line identity already exists (replays).
    pub duplicate_facts: u64,
    /// Facts skipped because a dimension key failed to resolve.
    pub rejected_facts: u64,
}

/// A provider for the relational warehouse.
#[derive(Clone)]
pub struct Warehouse {
    /// The Turso database instance. Cloneable and thread-safe.
    pub db: Database,
}

impl Warehouse {
    /// Opens a warehouse at a file path, or in-memory with `":memory:"`.
    pub async fn new(db_path: &str) -> Result<Self, WarehouseError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        // WAL mode helps concurrent readers on file-based databases and is a
        // no-op in memory. PRAGMA returns a row, so it goes through `query`.
        let conn = db
            .connect()
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        Ok(Self { db })
    }

    fn connect(&self) -> Result<Connection, WarehouseError> {
        self.db
            .connect()
            .map_err(|e| WarehouseError::Connection(e.to_string()))
    }

    /// Ensures all star-schema tables, indexes, and reporting views exist.
    /// Idempotent and safe to call on every startup.
    pub async fn initialize_schema(&self) -> Result<(), WarehouseError> {
        let conn = self.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        for statement in sql::ALL_VIEW_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// Loads one batch's star schema inside a single transaction.
    ///
    /// Dimensions are upserted by natural key first; the batch-local
    /// surrogate keys are then remapped onto warehouse keys read back inside
    /// the same transaction, so facts always reference committed dimension
    /// rows and repeated runs reuse existing keys. On any failure the entire
    /// transaction rolls back and the warehouse is left untouched.
    pub async fn load(&self, star: &StarSchema) -> Result<LoadReport, WarehouseError> {
        let conn = self.connect()?;
        conn.execute("BEGIN TRANSACTION", ()).await?;

        match self.load_in_transaction(&conn, star).await {
            Ok(report) => {
                conn.execute("COMMIT", ()).await?;
                info!(
                    "[load] committed: {} facts inserted, {} duplicates skipped, {} rejected",
                    report.facts_inserted, report.duplicate_facts, report.rejected_facts
                );
                Ok(report)
            }
            Err(e) => {
                warn!("[load] failed, rolling back transaction: {e}");
                conn.execute("ROLLBACK", ()).await?;
                Err(e)
            }
        }
    }

    async fn load_in_transaction(
        &self,
        conn: &Connection,
        star: &StarSchema,
    ) -> Result<LoadReport, WarehouseError> {
        let mut report = LoadReport::default();

        let mut stmt = conn.prepare(sql::UPSERT_DIM_DATE).await?;
        for row in &star.dates {
            let changes = stmt
                .execute(params![
                    row.date_key,
                    row.full_date.to_string(),
                    row.day as i64,
                    row.month as i64,
                    row.quarter as i64,
                    row.year as i64,
                    row.weekday.clone()
                ])
                .await?;
            report.dates_inserted += u64::from(changes > 0);
        }

        let mut stmt = conn.prepare(sql::UPSERT_DIM_PRODUCT).await?;
        for row in &star.products {
            stmt.execute(params![row.stock_code.clone(), row.description.clone()])
                .await?;
            report.products_upserted += 1;
        }

        let mut stmt = conn.prepare(sql::UPSERT_DIM_CUSTOMER).await?;
        for row in &star.customers {
            stmt.execute(params![row.customer_id, row.country.clone()])
                .await?;
            report.customers_upserted += 1;
        }

        // Natural-key -> warehouse-key maps, read back inside the
        // transaction so they include the rows upserted above.
        let product_keys = self.text_key_map(conn, sql::SELECT_PRODUCT_KEYS).await?;
        let customer_keys = self.integer_key_map(conn, sql::SELECT_CUSTOMER_KEYS).await?;

        // Batch key -> natural key, from the rows that assigned them.
        let batch_products: HashMap<i64, &str> = star
            .products
            .iter()
            .map(|p| (p.product_key, p.stock_code.as_str()))
            .collect();
        let batch_customers: HashMap<i64, i64> = star
            .customers
            .iter()
            .map(|c| (c.customer_key, c.customer_id))
            .collect();

        let mut stmt = conn.prepare(sql::INSERT_FACT_SALES).await?;
        for fact in &star.facts {
            let product_key = batch_products
                .get(&fact.product_key)
                .and_then(|code| product_keys.get(*code));
            let customer_key = batch_customers
                .get(&fact.customer_key)
                .and_then(|id| customer_keys.get(id));
            let (Some(&product_key), Some(&customer_key)) = (product_key, customer_key) else {
                debug!(
                    "[load] rejecting fact for invoice {}: unresolved dimension key",
                    fact.invoice_no
                );
                report.rejected_facts += 1;
                continue;
            };

            let changes = stmt
                .execute(params![
                    fact.invoice_no.clone(),
                    fact.date_key,
                    product_key,
                    customer_key,
                    fact.quantity,
                    fact.unit_price,
                    fact.sales_amount
                ])
                .await?;
            if changes > 0 {
                report.facts_inserted += 1;
            } else {
                report.duplicate_facts += 1;
            }
        }

        Ok(report)
    }

    async fn text_key_map(
        &self,
        conn: &Connection,
        query: &str,
    ) -> Result<HashMap<String, i64>, WarehouseError> {
        let mut rows = conn.query(query, ()).await?;
        let mut map = HashMap::new();
        while let Some(row) = rows.next().await? {
            if let (Ok(TursoValue::Text(natural)), Ok(TursoValue::Integer(key))) =
                (row.get_value(0), row.get_value(1))
            {
                map.insert(natural, key);
            }
        }
        Ok(map)
    }

    async fn integer_key_map(
        &self,
        conn: &Connection,
        query: &str,
    ) -> Result<HashMap<i64, i64>, WarehouseError> {
        let mut rows = conn.query(query, ()).await?;
        let mut map = HashMap::new();
        while let Some(row) = rows.next().await? {
            if let (Ok(TursoValue::Integer(natural)), Ok(TursoValue::Integer(key))) =
                (row.get_value(0), row.get_value(1))
            {
                map.insert(natural, key);
            }
        }
        Ok(map)
    }

    /// Executes a read-only query and returns the rows as a JSON array.
    /// This is the surface the reporting views are consumed through.
    pub async fn query_json(&self, query: &str) -> Result<String, WarehouseError> {
        debug!(query = %query, "--> executing warehouse query");
        let conn = self.connect()?;
        let mut stmt = conn.prepare(query).await?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt.query(()).await?;
        let mut results: Vec<JsonValue> = Vec::new();
        while let Some(row) = rows.next().await? {
            let mut row_map = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                row_map.insert(name.clone(), turso_value_to_json(row.get_value(i)?));
            }
            results.push(JsonValue::Object(row_map));
        }

        Ok(serde_json::to_string(&results)?)
    }
}

/// Converts a Turso value to a serde_json value.
fn turso_value_to_json(v: TursoValue) -> JsonValue {
    match v {
        TursoValue::Null => JsonValue::Null,
        TursoValue::Integer(i) => JsonValue::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        TursoValue::Text(s) => JsonValue::String(s),
        TursoValue::Blob(_) => JsonValue::String("<blob>".to_string()),
    }
}
