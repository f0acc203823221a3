//! Run-level error taxonomy.
//!
//! Row-level issues (validation drops, dimension rejections, duplicate
//! facts) are counters on the run summary, never errors. Everything here is
//! fatal for the run: the scheduler decides whether to retry.

use crate::extract::ExtractError;
use crate::publish::PublishError;
use crate::store::StoreError;
use crate::warehouse::WarehouseError;
use thiserror::Error;

/// Fatal errors for one pipeline invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The raw extract could not be fetched. Retryable once the source is
    /// reachable again.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    /// The extract does not have the expected shape. Not retryable without
    /// an input-format fix.
    #[error("input schema mismatch: {0}")]
    SchemaMismatch(String),
    /// The load transaction failed and was rolled back. Safe to retry from
    /// scratch; no partial state was committed.
    #[error("load transaction failed: {0}")]
    Load(#[from] WarehouseError),
    /// Publishing the processed output failed (after the commit).
    #[error("failed to publish processed output: {0}")]
    Publish(#[from] PublishError),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::SourceUnavailable(err.to_string())
    }
}

impl From<ExtractError> for PipelineError {
    fn from(err: ExtractError) -> Self {
        PipelineError::SchemaMismatch(err.to_string())
    }
}
