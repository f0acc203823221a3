//! # starlift
//!
//! A dimensional ETL transformer: reads a raw sales extract from object
//! storage, validates and normalizes it, derives a star schema (date,
//! product, and customer dimensions plus a sales fact table), loads it into
//! a relational warehouse in a single idempotent transaction, and publishes
//! the processed tables back to object storage for audit and replay.
//!
//! The object store and the warehouse are external collaborators reached
//! through [`store::ObjectStore`] and [`warehouse::Warehouse`]; everything
//! between extraction and load is a pure function over the batch.

pub mod clean;
pub mod errors;
pub mod extract;
pub mod pipeline;
pub mod publish;
pub mod schema;
pub mod store;
pub mod types;
pub mod warehouse;

pub use errors::PipelineError;
pub use pipeline::{run_pipeline, PipelineConfig, RunSummary};
