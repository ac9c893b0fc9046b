// src/summary/mod.rs

pub mod derive;

use anyhow::{Context, Result};
use rusqlite::{types::Value, Connection};
use tracing::{debug, info};

use crate::store::Store;

pub use derive::{clean_and_derive, SummaryRecord};

/// Name of the output table written by the summary builder.
pub const VENDOR_SALES_SUMMARY_TABLE: &str = "vendor_sales_summary";

/// Three subtotal CTEs joined into one denormalized result:
/// - freight cost summed per vendor,
/// - purchase quantity/dollars per (vendor, name, brand, description,
///   purchase price, actual price, volume), positive purchase prices only —
///   grouping by purchase price keeps distinct historical prices as
///   separate rows,
/// - sales quantity/dollars/price/excise tax per (vendor, brand).
/// Purchases drive the output: sales and freight are LEFT JOINed, so a
/// vendor/brand with no sales still appears (with NULLs, zero-filled later).
const SUMMARY_SQL: &str = r#"
WITH freight_summary AS (
    SELECT
        VendorNumber,
        SUM(Freight) AS FreightCost
    FROM vendor_invoice
    GROUP BY VendorNumber
),
purchase_summary AS (
    SELECT
        p.VendorNumber,
        p.VendorName,
        p.Brand,
        p.Description,
        p.PurchasePrice,
        pp.Price AS ActualPrice,
        pp.Volume,
        SUM(p.Quantity) AS TotalPurchaseQuantity,
        SUM(p.Dollars) AS TotalPurchaseDollars
    FROM purchases p
    JOIN purchase_prices pp
        ON p.Brand = pp.Brand
    WHERE p.PurchasePrice > 0
    GROUP BY p.VendorNumber, p.VendorName, p.Brand, p.Description,
             p.PurchasePrice, pp.Price, pp.Volume
),
sales_summary AS (
    SELECT
        VendorNo,
        Brand,
        SUM(SalesQuantity) AS TotalSalesQuantity,
        SUM(SalesDollars) AS TotalSalesDollars,
        SUM(SalesPrice) AS TotalSalesPrice,
        SUM(ExciseTax) AS TotalExciseTax
    FROM sales
    GROUP BY VendorNo, Brand
)
SELECT
    ps.VendorNumber,
    ps.VendorName,
    ps.Brand,
    ps.Description,
    ps.PurchasePrice,
    ps.ActualPrice,
    ps.Volume,
    ss.TotalSalesQuantity,
    ss.TotalSalesDollars,
    ss.TotalSalesPrice,
    ss.TotalExciseTax,
    ps.TotalPurchaseQuantity,
    ps.TotalPurchaseDollars,
    fs.FreightCost
FROM purchase_summary ps
LEFT JOIN sales_summary ss
    ON ps.VendorNumber = ss.VendorNo
    AND ps.Brand = ss.Brand
LEFT JOIN freight_summary fs
    ON ps.VendorNumber = fs.VendorNumber
ORDER BY ps.TotalPurchaseDollars DESC
"#;

/// One row of the joined result, before cleaning. Every field that can be
/// absent on the sales/freight side, or null in the base data, is optional;
/// `Volume` is carried raw because the reference table may store it as
/// either text or a number.
#[derive(Debug)]
pub struct JoinedRow {
    pub vendor_number: Option<i64>,
    pub vendor_name: Option<String>,
    pub brand: Option<i64>,
    pub description: Option<String>,
    pub purchase_price: Option<f64>,
    pub actual_price: Option<f64>,
    pub volume: Option<Value>,
    pub total_sales_quantity: Option<f64>,
    pub total_sales_dollars: Option<f64>,
    pub total_sales_price: Option<f64>,
    pub total_excise_tax: Option<f64>,
    pub total_purchase_quantity: Option<f64>,
    pub total_purchase_dollars: Option<f64>,
    pub freight_cost: Option<f64>,
}

/// Run the aggregation query against the populated base tables. Rows come
/// back ordered by total purchase dollars, descending.
pub fn compute_summary(conn: &Connection) -> Result<Vec<JoinedRow>> {
    let mut stmt = conn
        .prepare(SUMMARY_SQL)
        .context("preparing vendor summary query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(JoinedRow {
                vendor_number: row.get(0)?,
                vendor_name: row.get(1)?,
                brand: row.get(2)?,
                description: row.get(3)?,
                purchase_price: row.get(4)?,
                actual_price: row.get(5)?,
                volume: row.get(6)?,
                total_sales_quantity: row.get(7)?,
                total_sales_dollars: row.get(8)?,
                total_sales_price: row.get(9)?,
                total_excise_tax: row.get(10)?,
                total_purchase_quantity: row.get(11)?,
                total_purchase_dollars: row.get(12)?,
                freight_cost: row.get(13)?,
            })
        })
        .context("running vendor summary query")?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Full summary pass: query, clean, derive metrics, write the result table.
/// The write goes through the loader's replace primitive, so re-runs are
/// idempotent. Returns the number of rows written.
pub fn build_vendor_sales_summary(store: &mut Store) -> Result<usize> {
    info!("creating vendor summary table");
    let rows = compute_summary(store.conn())?;
    info!(rows = rows.len(), "summary query complete");
    for row in rows.iter().take(5) {
        debug!(?row, "joined row");
    }

    info!("cleaning data");
    let records = clean_and_derive(rows);
    for rec in records.iter().take(5) {
        debug!(?rec, "summary record");
    }

    info!("writing {VENDOR_SALES_SUMMARY_TABLE}");
    let batch = derive::to_record_batch(&records)?;
    store.replace_table(VENDOR_SALES_SUMMARY_TABLE, &batch)?;
    info!(rows = records.len(), "completed");
    Ok(records.len())
}
