//! # starlift-cli
//!
//! "Run once with a given input key" entry point for the ETL pipeline,
//! suitable for invocation by an external scheduler. The exit code is the
//! success/failure signal; the run summary is printed to stdout as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use starlift::store::{HttpStore, LocalStore, ObjectStore};
use starlift::warehouse::Warehouse;
use starlift::{run_pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Object key of the raw sales extract, e.g. raw/sales.csv
    #[arg(long)]
    input: String,

    /// Path to the warehouse database file
    #[arg(long, env = "STARLIFT_DB", default_value = "starlift.db")]
    db: String,

    /// Endpoint of an S3-compatible object store (e.g. http://minio:9000).
    /// When unset, --store-root is used instead.
    #[arg(long, env = "STARLIFT_ENDPOINT")]
    endpoint: Option<String>,

    /// Bucket name on the object store
    #[arg(long, env = "STARLIFT_BUCKET", default_value = "sales")]
    bucket: String,

    /// Root directory of a local object store
    #[arg(long, env = "STARLIFT_STORE_ROOT")]
    store_root: Option<PathBuf>,

    /// Prefix the processed tables are published under
    #[arg(long, default_value = "cleaned_data")]
    publish_prefix: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let store: Box<dyn ObjectStore> = match (&cli.endpoint, &cli.store_root) {
        (Some(endpoint), _) => {
            info!("using object store at {endpoint}, bucket {}", cli.bucket);
            Box::new(HttpStore::new(endpoint, &cli.bucket))
        }
        (None, Some(root)) => {
            info!("using local object store at {}", root.display());
            Box::new(LocalStore::new(root))
        }
        (None, None) => bail!("either --endpoint or --store-root must be provided"),
    };

    let warehouse = Warehouse::new(&cli.db)
        .await
        .with_context(|| format!("failed to open warehouse at {}", cli.db))?;
    warehouse
        .initialize_schema()
        .await
        .context("failed to initialize warehouse schema")?;

    let mut config = PipelineConfig::new(&cli.input);
    config.publish_prefix = cli.publish_prefix;

    let summary = run_pipeline(store.as_ref(), &warehouse, &config).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
