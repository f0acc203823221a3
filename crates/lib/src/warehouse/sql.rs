//! Warehouse SQL statements.
//!
//! Centralizes the DDL for the star schema, the reporting views derived from
//! it, and the statements the loader executes. Keeping the SQL here isolates
//! database-specific syntax from the load logic.

/// Star-schema tables. Dimensions carry a unique natural key so repeated
/// loads upsert instead of duplicating; facts carry a unique line-identity
/// index so replaying a batch is a no-op.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS DimDate (
        DateKey INTEGER PRIMARY KEY,
        FullDate TEXT NOT NULL,
        Day INTEGER NOT NULL,
        Month INTEGER NOT NULL,
        Quarter INTEGER NOT NULL,
        Year INTEGER NOT NULL,
        Weekday TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS DimProduct (
        ProductKey INTEGER PRIMARY KEY,
        StockCode TEXT NOT NULL UNIQUE,
        Description TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS DimCustomer (
        CustomerKey INTEGER PRIMARY KEY,
        CustomerId INTEGER NOT NULL UNIQUE,
        Country TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS FactSales (
        InvoiceNo TEXT NOT NULL,
        DateKey INTEGER NOT NULL REFERENCES DimDate(DateKey),
        ProductKey INTEGER NOT NULL REFERENCES DimProduct(ProductKey),
        CustomerKey INTEGER NOT NULL REFERENCES DimCustomer(CustomerKey),
        Quantity INTEGER NOT NULL,
        UnitPrice REAL NOT NULL,
        SalesAmount REAL NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_fact_sales_line
        ON FactSales (InvoiceNo, ProductKey, DateKey, Quantity, UnitPrice)",
];

/// Read-only reporting views. Re-derivable at any time from the fact and
/// dimension tables; not part of the load path.
pub const ALL_VIEW_CREATION_SQL: &[&str] = &[
    "CREATE VIEW IF NOT EXISTS vw_monthly_revenue AS
        SELECT d.Year AS Year, d.Month AS Month, SUM(f.SalesAmount) AS Revenue,
               SUM(f.Quantity) AS UnitsSold,
               COUNT(DISTINCT f.InvoiceNo) AS Invoices
        FROM FactSales f
        JOIN DimDate d ON d.DateKey = f.DateKey
        GROUP BY d.Year, d.Month
        ORDER BY d.Year, d.Month",
    "CREATE VIEW IF NOT EXISTS vw_top_products AS
        SELECT p.StockCode AS StockCode, p.Description AS Description,
               SUM(f.Quantity) AS UnitsSold,
               SUM(f.SalesAmount) AS Revenue
        FROM FactSales f
        JOIN DimProduct p ON p.ProductKey = f.ProductKey
        GROUP BY p.StockCode, p.Description
        ORDER BY Revenue DESC",
    "CREATE VIEW IF NOT EXISTS vw_revenue_by_country AS
        SELECT c.Country AS Country,
               COUNT(DISTINCT c.CustomerId) AS Customers,
               SUM(f.SalesAmount) AS Revenue
        FROM FactSales f
        JOIN DimCustomer c ON c.CustomerKey = f.CustomerKey
        GROUP BY c.Country
        ORDER BY Revenue DESC",
    "CREATE VIEW IF NOT EXISTS vw_weekday_revenue AS
        SELECT d.Weekday AS Weekday,
               SUM(f.SalesAmount) AS Revenue,
               COUNT(DISTINCT f.InvoiceNo) AS Invoices
        FROM FactSales f
        JOIN DimDate d ON d.DateKey = f.DateKey
        GROUP BY d.Weekday
        ORDER BY Revenue DESC",
    "CREATE VIEW IF NOT EXISTS vw_customer_value AS
        SELECT c.CustomerId AS CustomerId, c.Country AS Country,
               COUNT(DISTINCT f.InvoiceNo) AS Orders,
               SUM(f.SalesAmount) AS Revenue,
               SUM(f.SalesAmount) / COUNT(DISTINCT f.InvoiceNo) AS AvgOrderValue
        FROM FactSales f
        JOIN DimCustomer c ON c.CustomerKey = f.CustomerKey
        GROUP BY c.CustomerId, c.Country
        ORDER BY Revenue DESC",
];

/// DimDate rows are immutable once created; conflicts are ignored.
pub const UPSERT_DIM_DATE: &str = "INSERT INTO DimDate \
    (DateKey, FullDate, Day, Month, Quarter, Year, Weekday) \
    VALUES (?, ?, ?, ?, ?, ?, ?) \
    ON CONFLICT(DateKey) DO NOTHING";

/// Product attributes update in place on natural-key collision.
pub const UPSERT_DIM_PRODUCT: &str = "INSERT INTO DimProduct \
    (StockCode, Description) VALUES (?, ?) \
    ON CONFLICT(StockCode) DO UPDATE SET Description = excluded.Description";

/// Customer attributes update in place on natural-key collision.
pub const UPSERT_DIM_CUSTOMER: &str = "INSERT INTO DimCustomer \
    (CustomerId, Country) VALUES (?, ?) \
    ON CONFLICT(CustomerId) DO UPDATE SET Country = excluded.Country";

/// Fact inserts rely on the line-identity index: replayed lines are ignored
/// so a re-run never double-counts revenue.
pub const INSERT_FACT_SALES: &str = "INSERT OR IGNORE INTO FactSales \
    (InvoiceNo, DateKey, ProductKey, CustomerKey, Quantity, UnitPrice, SalesAmount) \
    VALUES (?, ?, ?, ?, ?, ?, ?)";

pub const SELECT_PRODUCT_KEYS: &str = "SELECT StockCode, ProductKey FROM DimProduct";
pub const SELECT_CUSTOMER_KEYS: &str = "SELECT CustomerId, CustomerKey FROM DimCustomer";
