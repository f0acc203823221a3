//! Shared helpers for starlift tests: an in-memory warehouse with the
//! schema applied, an in-memory object store, and raw-extract fixtures.

use anyhow::Result;
use async_trait::async_trait;
use starlift::store::{ObjectStore, StoreError};
use starlift::warehouse::Warehouse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The header row of the raw sales extract fixtures.
pub const RAW_HEADER: &str =
    "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country";

/// Builds a raw extract from data lines (without the header).
pub fn raw_extract(lines: &[&str]) -> String {
    let mut csv = String::from(RAW_HEADER);
    for line in lines {
        csv.push('\n');
        csv.push_str(line);
    }
    csv.push('\n');
    csv
}

/// A test harness holding an in-memory warehouse and object store.
pub struct TestSetup {
    pub warehouse: Warehouse,
    pub store: MemoryStore,
}

impl TestSetup {
    /// Creates a new, isolated in-memory warehouse with the star schema and
    /// views applied, plus an empty in-memory object store.
    pub async fn new() -> Result<Self> {
        let warehouse = Warehouse::new(":memory:").await?;
        warehouse.initialize_schema().await?;
        Ok(Self {
            warehouse,
            store: MemoryStore::default(),
        })
    }

    /// Creates a harness with the given raw extract preloaded under a key.
    pub async fn with_raw_extract(key: &str, csv: &str) -> Result<Self> {
        let setup = Self::new().await?;
        setup.store.insert(key, csv.as_bytes());
        Ok(setup)
    }
}

/// An in-memory `ObjectStore` for tests. Cloning shares the same objects.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Pre-populates an object, bypassing the trait.
    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
    }

    /// All keys currently stored, sorted for stable assertions.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.insert(key, bytes);
        Ok(())
    }
}
