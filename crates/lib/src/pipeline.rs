//! Pipeline orchestration: extract, clean, build, load, publish.
//!
//! One invocation processes one raw object. The whole transform is pure;
//! the only side effects are the final load transaction and the publish
//! step, so a failed run leaves the warehouse unchanged and the pipeline is
//! safe to invoke repeatedly on the same input.

use crate::clean::{clean_records, DiscardStats};
use crate::errors::PipelineError;
use crate::extract::parse_raw_records;
use crate::publish::publish_star_schema;
use crate::schema::build_star_schema;
use crate::store::ObjectStore;
use crate::warehouse::Warehouse;
use serde::Serialize;
use tracing::info;

/// Configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Object key of the raw extract, e.g. `raw/sales.csv`.
    pub input_key: String,
    /// Prefix the processed tables are published under.
    pub publish_prefix: String,
}

impl PipelineConfig {
    pub fn new(input_key: impl Into<String>) -> Self {
        Self {
            input_key: input_key.into(),
            publish_prefix: "cleaned_data".to_string(),
        }
    }
}

/// Row accounting for one completed run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RunSummary {
    pub rows_extracted: u64,
    pub rows_cleaned: u64,
    pub discarded: DiscardStats,
    pub date_rows: u64,
    pub product_rows: u64,
    pub customer_rows: u64,
    pub facts_inserted: u64,
    pub duplicate_facts: u64,
    pub rejected_facts: u64,
}

/// Runs the pipeline once against the given collaborators.
///
/// The warehouse schema must already exist (see
/// [`Warehouse::initialize_schema`]).
pub async fn run_pipeline(
    store: &dyn ObjectStore,
    warehouse: &Warehouse,
    config: &PipelineConfig,
) -> Result<RunSummary, PipelineError> {
    info!("[pipeline] starting run for {}", config.input_key);

    let bytes = store.get(&config.input_key).await?;
    let raw = parse_raw_records(&bytes)?;
    let rows_extracted = raw.len() as u64;

    let outcome = clean_records(raw);
    let star = build_star_schema(&outcome.records);
    let report = warehouse.load(&star).await?;
    publish_star_schema(store, &star, &config.publish_prefix).await?;

    let summary = RunSummary {
        rows_extracted,
        rows_cleaned: outcome.records.len() as u64,
        discarded: outcome.discarded,
        date_rows: star.dates.len() as u64,
        product_rows: star.products.len() as u64,
        customer_rows: star.customers.len() as u64,
        facts_inserted: report.facts_inserted,
        duplicate_facts: report.duplicate_facts,
        rejected_facts: report.rejected_facts,
    };
    info!("[pipeline] run complete: {summary:?}");
    Ok(summary)
}
