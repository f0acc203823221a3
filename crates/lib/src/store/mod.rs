//! Object storage collaborators.
//!
//! The pipeline reads its raw extract from and publishes its processed
//! tables to an object store. The store itself is an external system; this
//! module only defines the seam ([`ObjectStore`]) and two concrete clients:
//! an S3-style HTTP store and a local directory store.

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod local;

pub use http::HttpStore;
pub use local::LocalStore;

/// Errors raised by an object store client.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("store request failed: {0}")]
    Http(String),
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::Http(err.to_string())
    }
}

/// A minimal GET/PUT interface over an object store.
///
/// Keys are slash-separated paths relative to the configured bucket or root,
/// e.g. `raw/sales.csv` or `cleaned_data/FactSales.csv`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetches the full contents of an object.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Writes an object, replacing any existing content under the key.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
}
