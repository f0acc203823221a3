//! End-to-end pipeline tests against an in-memory warehouse and object
//! store: idempotent reloads, referential integrity, discard accounting,
//! transactional rollback, and the reporting views.

use anyhow::Result;
use serde_json::Value;
use starlift::store::ObjectStore;
use starlift::warehouse::Warehouse;
use starlift::{run_pipeline, PipelineConfig, PipelineError};
use starlift_test_utils::{raw_extract, TestSetup};

const INPUT_KEY: &str = "raw/sales.csv";

const ROW_HEART: &str =
    "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01 08:26:00,2.55,17850,United Kingdom";
const ROW_LANTERN: &str =
    "536366,71053,WHITE METAL LANTERN,4,2010-12-01 08:28:00,3.39,13047,United Kingdom";
const ROW_JANUARY: &str =
    "540210,22386,JUMBO BAG PINK POLKADOT,10,2011-01-05 10:00:00,1.95,12583,France";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .try_init();
}

async fn rows(warehouse: &Warehouse, sql: &str) -> Result<Vec<Value>> {
    Ok(serde_json::from_str(&warehouse.query_json(sql).await?)?)
}

async fn scalar_i64(warehouse: &Warehouse, sql: &str, column: &str) -> Result<i64> {
    let rows = rows(warehouse, sql).await?;
    Ok(rows[0][column].as_i64().unwrap_or_default())
}

async fn scalar_f64(warehouse: &Warehouse, sql: &str, column: &str) -> Result<f64> {
    let rows = rows(warehouse, sql).await?;
    Ok(rows[0][column].as_f64().unwrap_or_default())
}

async fn total_revenue(warehouse: &Warehouse) -> Result<f64> {
    scalar_f64(
        warehouse,
        "SELECT COALESCE(SUM(SalesAmount), 0.0) AS revenue FROM FactSales",
        "revenue",
    )
    .await
}

#[tokio::test]
async fn single_row_populates_all_star_tables() -> Result<()> {
    init_tracing();
    let setup = TestSetup::with_raw_extract(INPUT_KEY, &raw_extract(&[ROW_HEART])).await?;

    let summary = run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await?;

    assert_eq!(summary.rows_extracted, 1);
    assert_eq!(summary.rows_cleaned, 1);
    assert_eq!(summary.discarded.total(), 0);
    assert_eq!(summary.facts_inserted, 1);
    assert_eq!(summary.rejected_facts, 0);

    let dates = rows(&setup.warehouse, "SELECT * FROM DimDate").await?;
    assert_eq!(dates.len(), 1);
    assert_eq!(dates[0]["DateKey"], 20101201);
    assert_eq!(dates[0]["Year"], 2010);
    assert_eq!(dates[0]["Quarter"], 4);
    assert_eq!(dates[0]["Weekday"], "Wednesday");

    let products = rows(&setup.warehouse, "SELECT * FROM DimProduct").await?;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["StockCode"], "85123A");

    let customers = rows(&setup.warehouse, "SELECT * FROM DimCustomer").await?;
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0]["CustomerId"], 17850);
    assert_eq!(customers[0]["Country"], "United Kingdom");

    let amount = scalar_f64(
        &setup.warehouse,
        "SELECT SalesAmount AS amount FROM FactSales",
        "amount",
    )
    .await?;
    assert!((amount - 15.30).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn rerunning_the_same_batch_is_idempotent() -> Result<()> {
    init_tracing();
    let setup =
        TestSetup::with_raw_extract(INPUT_KEY, &raw_extract(&[ROW_HEART, ROW_LANTERN])).await?;
    let config = PipelineConfig::new(INPUT_KEY);

    let first = run_pipeline(&setup.store, &setup.warehouse, &config).await?;
    assert_eq!(first.facts_inserted, 2);
    let revenue_after_first = total_revenue(&setup.warehouse).await?;

    let second = run_pipeline(&setup.store, &setup.warehouse, &config).await?;
    assert_eq!(second.facts_inserted, 0);
    assert_eq!(second.duplicate_facts, 2);

    for (table, expected) in [("DimDate", 1), ("DimProduct", 2), ("DimCustomer", 2)] {
        let count = scalar_i64(
            &setup.warehouse,
            &format!("SELECT COUNT(*) AS n FROM {table}"),
            "n",
        )
        .await?;
        assert_eq!(count, expected, "{table} duplicated on re-run");
    }
    let fact_count =
        scalar_i64(&setup.warehouse, "SELECT COUNT(*) AS n FROM FactSales", "n").await?;
    assert_eq!(fact_count, 2);
    assert!((total_revenue(&setup.warehouse).await? - revenue_after_first).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn returns_and_malformed_rows_are_discarded_not_rejected() -> Result<()> {
    init_tracing();
    let extract = raw_extract(&[
        ROW_HEART,
        // A return: negative quantity.
        "C536379,85123A,WHITE HANGING HEART T-LIGHT HOLDER,-1,2010-12-01 09:41:00,2.55,17850,United Kingdom",
        // Zero price.
        "536380,22960,JAM MAKING SET,6,2010-12-01 09:41:00,0.0,17850,United Kingdom",
        // Missing invoice number.
        ",22961,JAM JARS,12,2010-12-01 09:41:00,1.45,17850,United Kingdom",
    ]);
    let setup = TestSetup::with_raw_extract(INPUT_KEY, &extract).await?;

    let summary = run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await?;

    assert_eq!(summary.rows_extracted, 4);
    assert_eq!(summary.rows_cleaned, 1);
    assert_eq!(summary.discarded.non_positive_quantity, 1);
    assert_eq!(summary.discarded.non_positive_price, 1);
    assert_eq!(summary.discarded.missing_invoice, 1);
    assert_eq!(summary.rejected_facts, 0, "discards must not count as rejections");

    let bad_facts = scalar_i64(
        &setup.warehouse,
        "SELECT COUNT(*) AS n FROM FactSales WHERE Quantity <= 0 OR UnitPrice <= 0",
        "n",
    )
    .await?;
    assert_eq!(bad_facts, 0);
    Ok(())
}

#[tokio::test]
async fn conflicting_descriptions_resolve_to_the_latest() -> Result<()> {
    init_tracing();
    let extract = raw_extract(&[
        "536365,85123A,WHITE HANGING HEART,6,2010-12-01 08:26:00,2.55,17850,United Kingdom",
        "536370,85123A,CREAM HANGING HEART,3,2010-12-01 09:00:00,2.55,12583,France",
    ]);
    let setup = TestSetup::with_raw_extract(INPUT_KEY, &extract).await?;
    let config = PipelineConfig::new(INPUT_KEY);
    run_pipeline(&setup.store, &setup.warehouse, &config).await?;

    let products = rows(&setup.warehouse, "SELECT * FROM DimProduct").await?;
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["Description"], "CREAM HANGING HEART");
    let first_key = products[0]["ProductKey"].as_i64().unwrap();

    // A later batch renames the product again: same row, new description.
    setup.store.insert(
        INPUT_KEY,
        raw_extract(&[
            "540001,85123A,RED HANGING HEART,2,2011-01-10 11:00:00,2.95,17850,United Kingdom",
        ])
        .as_bytes(),
    );
    run_pipeline(&setup.store, &setup.warehouse, &config).await?;

    let products = rows(&setup.warehouse, "SELECT * FROM DimProduct").await?;
    assert_eq!(products.len(), 1, "cross-run upsert must not duplicate");
    assert_eq!(products[0]["Description"], "RED HANGING HEART");
    assert_eq!(
        products[0]["ProductKey"].as_i64().unwrap(),
        first_key,
        "surrogate key must survive attribute updates"
    );
    Ok(())
}

#[tokio::test]
async fn anonymous_sales_map_to_the_unknown_customer() -> Result<()> {
    init_tracing();
    let extract = raw_extract(&[
        "536390,21755,LOVE BUILDING BLOCK WORD,3,2010-12-01 10:19:00,5.95,,United Kingdom",
    ]);
    let setup = TestSetup::with_raw_extract(INPUT_KEY, &extract).await?;
    let config = PipelineConfig::new(INPUT_KEY);

    run_pipeline(&setup.store, &setup.warehouse, &config).await?;
    run_pipeline(&setup.store, &setup.warehouse, &config).await?;

    let customers = rows(&setup.warehouse, "SELECT * FROM DimCustomer").await?;
    assert_eq!(customers.len(), 1, "sentinel row must not duplicate across runs");
    assert_eq!(customers[0]["CustomerId"], -1);

    let linked = scalar_i64(
        &setup.warehouse,
        "SELECT COUNT(*) AS n FROM FactSales f \
         JOIN DimCustomer c ON c.CustomerKey = f.CustomerKey WHERE c.CustomerId = -1",
        "n",
    )
    .await?;
    assert_eq!(linked, 1);
    Ok(())
}

#[tokio::test]
async fn every_fact_references_existing_dimension_rows() -> Result<()> {
    init_tracing();
    let setup = TestSetup::with_raw_extract(
        INPUT_KEY,
        &raw_extract(&[ROW_HEART, ROW_LANTERN, ROW_JANUARY]),
    )
    .await?;
    run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await?;

    for (dim, key) in [
        ("DimDate", "DateKey"),
        ("DimProduct", "ProductKey"),
        ("DimCustomer", "CustomerKey"),
    ] {
        let orphans = scalar_i64(
            &setup.warehouse,
            &format!(
                "SELECT COUNT(*) AS n FROM FactSales f \
                 LEFT JOIN {dim} d ON d.{key} = f.{key} WHERE d.{key} IS NULL"
            ),
            "n",
        )
        .await?;
        assert_eq!(orphans, 0, "orphaned facts against {dim}");
    }
    Ok(())
}

#[tokio::test]
async fn failed_load_leaves_the_warehouse_unchanged() -> Result<()> {
    init_tracing();
    let setup = TestSetup::with_raw_extract(INPUT_KEY, &raw_extract(&[ROW_HEART])).await?;
    let config = PipelineConfig::new(INPUT_KEY);
    run_pipeline(&setup.store, &setup.warehouse, &config).await?;

    let product_count_before =
        scalar_i64(&setup.warehouse, "SELECT COUNT(*) AS n FROM DimProduct", "n").await?;
    let revenue_before = total_revenue(&setup.warehouse).await?;

    // Break the customer upsert target: without the unique natural key the
    // ON CONFLICT clause fails, after dates and products were upserted.
    let conn = setup.warehouse.db.connect()?;
    conn.execute("DROP TABLE DimCustomer", ()).await?;
    conn.execute(
        "CREATE TABLE DimCustomer (
            CustomerKey INTEGER PRIMARY KEY,
            CustomerId INTEGER NOT NULL,
            Country TEXT NOT NULL
        )",
        (),
    )
    .await?;

    setup.store.insert(INPUT_KEY, raw_extract(&[ROW_LANTERN]).as_bytes());
    let err = run_pipeline(&setup.store, &setup.warehouse, &config)
        .await
        .expect_err("load should fail");
    assert!(matches!(err, PipelineError::Load(_)), "got {err:?}");

    let product_count_after =
        scalar_i64(&setup.warehouse, "SELECT COUNT(*) AS n FROM DimProduct", "n").await?;
    assert_eq!(
        product_count_after, product_count_before,
        "partially loaded dimensions must roll back"
    );
    assert!((total_revenue(&setup.warehouse).await? - revenue_before).abs() < 1e-9);
    Ok(())
}

#[tokio::test]
async fn missing_source_object_is_source_unavailable() -> Result<()> {
    init_tracing();
    let setup = TestSetup::new().await?;
    let err = run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new("raw/absent.csv"),
    )
    .await
    .expect_err("missing object should fail the run");
    assert!(matches!(err, PipelineError::SourceUnavailable(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn wrong_columns_are_a_schema_mismatch() -> Result<()> {
    init_tracing();
    let setup =
        TestSetup::with_raw_extract(INPUT_KEY, "OrderId,Sku,Amount\n1,A,2.0\n").await?;
    let err = run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await
    .expect_err("wrong columns should fail the run");
    assert!(matches!(err, PipelineError::SchemaMismatch(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn processed_tables_are_published_for_audit() -> Result<()> {
    init_tracing();
    let setup =
        TestSetup::with_raw_extract(INPUT_KEY, &raw_extract(&[ROW_HEART, ROW_LANTERN])).await?;
    run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await?;

    let keys = setup.store.keys();
    for table in ["DimDate", "DimProduct", "DimCustomer", "FactSales"] {
        assert!(
            keys.contains(&format!("cleaned_data/{table}.csv")),
            "missing published {table}, have {keys:?}"
        );
    }

    let facts_csv = String::from_utf8(setup.store.get("cleaned_data/FactSales.csv").await?)?;
    // Header plus one line per fact.
    assert_eq!(facts_csv.lines().count(), 3);
    Ok(())
}

#[tokio::test]
async fn reporting_views_aggregate_the_fact_table() -> Result<()> {
    init_tracing();
    let setup = TestSetup::with_raw_extract(
        INPUT_KEY,
        &raw_extract(&[ROW_HEART, ROW_LANTERN, ROW_JANUARY]),
    )
    .await?;
    run_pipeline(
        &setup.store,
        &setup.warehouse,
        &PipelineConfig::new(INPUT_KEY),
    )
    .await?;

    let monthly = rows(
        &setup.warehouse,
        "SELECT * FROM vw_monthly_revenue ORDER BY Year, Month",
    )
    .await?;
    assert_eq!(monthly.len(), 2);
    assert_eq!(monthly[0]["Year"], 2010);
    assert_eq!(monthly[0]["Month"], 12);
    let december = monthly[0]["Revenue"].as_f64().unwrap();
    assert!((december - (6.0 * 2.55 + 4.0 * 3.39)).abs() < 1e-9);
    assert_eq!(monthly[1]["Year"], 2011);
    let january = monthly[1]["Revenue"].as_f64().unwrap();
    assert!((january - 10.0 * 1.95).abs() < 1e-9);

    let top = rows(
        &setup.warehouse,
        "SELECT * FROM vw_top_products ORDER BY Revenue DESC",
    )
    .await?;
    assert_eq!(top.len(), 3);
    // JUMBO BAG: 10 * 1.95 = 19.50 is the largest line.
    assert_eq!(top[0]["StockCode"], "22386");

    let by_country = rows(&setup.warehouse, "SELECT * FROM vw_revenue_by_country").await?;
    assert_eq!(by_country.len(), 2);

    let weekday = rows(&setup.warehouse, "SELECT * FROM vw_weekday_revenue").await?;
    assert!(!weekday.is_empty());

    let value = rows(&setup.warehouse, "SELECT * FROM vw_customer_value").await?;
    assert_eq!(value.len(), 3);
    for row in &value {
        assert!(row["AvgOrderValue"].as_f64().unwrap() > 0.0);
    }
    Ok(())
}
