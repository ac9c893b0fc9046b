use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, Int64Array, StringArray},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use rusqlite::types::Value;
use std::sync::Arc;

use super::JoinedRow;

/// Cleaned, fully-populated summary row. No field is ever null: absent
/// sales/freight values are zero, text fields are trimmed.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub vendor_number: i64,
    pub vendor_name: String,
    pub brand: i64,
    pub description: String,
    pub purchase_price: f64,
    pub actual_price: f64,
    pub volume: f64,
    pub total_sales_quantity: f64,
    pub total_sales_dollars: f64,
    pub total_sales_price: f64,
    pub total_excise_tax: f64,
    pub total_purchase_quantity: f64,
    pub total_purchase_dollars: f64,
    pub freight_cost: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,
    pub stock_turnover: f64,
    pub sales_to_purchase_ratio: f64,
}

/// Zero denominators are substituted with 1 instead of skipping the row or
/// emitting a null. Business rule, not a numeric workaround: a zero-sales
/// row gets a zero-filled ratio, not an undefined one.
fn nz(denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        denominator
    }
}

/// The Volume reference column arrives as whatever the base table holds;
/// coerce it to f64. Unparseable or missing values become 0.
fn coerce_volume(raw: Option<Value>) -> f64 {
    match raw {
        Some(Value::Real(f)) => f,
        Some(Value::Integer(i)) => i as f64,
        Some(Value::Text(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Clean the joined rows and compute the four derived metrics. Input order
/// is preserved (the query already sorts by purchase dollars descending).
pub fn clean_and_derive(rows: Vec<JoinedRow>) -> Vec<SummaryRecord> {
    rows.into_iter().map(clean_row).collect()
}

fn clean_row(row: JoinedRow) -> SummaryRecord {
    let total_sales_quantity = row.total_sales_quantity.unwrap_or(0.0);
    let total_sales_dollars = row.total_sales_dollars.unwrap_or(0.0);
    let total_purchase_quantity = row.total_purchase_quantity.unwrap_or(0.0);
    let total_purchase_dollars = row.total_purchase_dollars.unwrap_or(0.0);

    let gross_profit = total_sales_dollars - total_purchase_dollars;
    // A row with no sales reports a zero margin rather than an undefined
    // (or runaway negative) percentage.
    let profit_margin = if total_sales_dollars == 0.0 {
        0.0
    } else {
        gross_profit / total_sales_dollars * 100.0
    };
    let stock_turnover = total_sales_quantity / nz(total_purchase_quantity);
    let sales_to_purchase_ratio = total_sales_dollars / nz(total_purchase_dollars);

    SummaryRecord {
        vendor_number: row.vendor_number.unwrap_or(0),
        vendor_name: row.vendor_name.map(|s| s.trim().to_string()).unwrap_or_default(),
        brand: row.brand.unwrap_or(0),
        description: row.description.map(|s| s.trim().to_string()).unwrap_or_default(),
        purchase_price: row.purchase_price.unwrap_or(0.0),
        actual_price: row.actual_price.unwrap_or(0.0),
        volume: coerce_volume(row.volume),
        total_sales_quantity,
        total_sales_dollars,
        total_sales_price: row.total_sales_price.unwrap_or(0.0),
        total_excise_tax: row.total_excise_tax.unwrap_or(0.0),
        total_purchase_quantity,
        total_purchase_dollars,
        freight_cost: row.freight_cost.unwrap_or(0.0),
        gross_profit,
        profit_margin,
        stock_turnover,
        sales_to_purchase_ratio,
    }
}

fn float_col<F>(records: &[SummaryRecord], f: F) -> ArrayRef
where
    F: Fn(&SummaryRecord) -> f64,
{
    Arc::new(Float64Array::from(
        records.iter().map(f).collect::<Vec<_>>(),
    ))
}

fn int_col<F>(records: &[SummaryRecord], f: F) -> ArrayRef
where
    F: Fn(&SummaryRecord) -> i64,
{
    Arc::new(Int64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn text_col<'a, F>(records: &'a [SummaryRecord], f: F) -> ArrayRef
where
    F: Fn(&'a SummaryRecord) -> &'a str,
{
    Arc::new(StringArray::from_iter_values(records.iter().map(f)))
}

/// Assemble the output batch with the summary table's column layout.
pub fn to_record_batch(records: &[SummaryRecord]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("VendorNumber", DataType::Int64, false),
        Field::new("VendorName", DataType::Utf8, false),
        Field::new("Brand", DataType::Int64, false),
        Field::new("Description", DataType::Utf8, false),
        Field::new("PurchasePrice", DataType::Float64, false),
        Field::new("ActualPrice", DataType::Float64, false),
        Field::new("Volume", DataType::Float64, false),
        Field::new("TotalSalesQuantity", DataType::Float64, false),
        Field::new("TotalSalesDollars", DataType::Float64, false),
        Field::new("TotalSalesPrice", DataType::Float64, false),
        Field::new("TotalExciseTax", DataType::Float64, false),
        Field::new("TotalPurchaseQuantity", DataType::Float64, false),
        Field::new("TotalPurchaseDollars", DataType::Float64, false),
        Field::new("FreightCost", DataType::Float64, false),
        Field::new("GrossProfit", DataType::Float64, false),
        Field::new("ProfitMargin", DataType::Float64, false),
        Field::new("StockTurnover", DataType::Float64, false),
        Field::new("SalesToPurchaseRatio", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        int_col(records, |r| r.vendor_number),
        text_col(records, |r| r.vendor_name.as_str()),
        int_col(records, |r| r.brand),
        text_col(records, |r| r.description.as_str()),
        float_col(records, |r| r.purchase_price),
        float_col(records, |r| r.actual_price),
        float_col(records, |r| r.volume),
        float_col(records, |r| r.total_sales_quantity),
        float_col(records, |r| r.total_sales_dollars),
        float_col(records, |r| r.total_sales_price),
        float_col(records, |r| r.total_excise_tax),
        float_col(records, |r| r.total_purchase_quantity),
        float_col(records, |r| r.total_purchase_dollars),
        float_col(records, |r| r.freight_cost),
        float_col(records, |r| r.gross_profit),
        float_col(records, |r| r.profit_margin),
        float_col(records, |r| r.stock_turnover),
        float_col(records, |r| r.sales_to_purchase_ratio),
    ];

    RecordBatch::try_new(schema, columns).map_err(Into::into)
}
