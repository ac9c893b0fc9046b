// src/store/mod.rs

use anyhow::{Context, Result};
use arrow::{
    array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Schema},
    record_batch::RecordBatch,
};
use rusqlite::{params_from_iter, types::Value, Connection};
use std::path::Path;
use tracing::debug;

/// Wrapper around the SQLite connection. Constructed once per run and passed
/// explicitly to the loader and the summary builder; there is no global
/// engine.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        Ok(Store { conn })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Store {
            conn: Connection::open_in_memory().context("opening in-memory database")?,
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Destructive write: drops `table` if it exists, recreates it from the
    /// batch's schema, and inserts every row. Column names are preserved and
    /// no index column is added. Prior contents are gone after this call.
    pub fn replace_table(&mut self, table: &str, batch: &RecordBatch) -> Result<()> {
        let create = create_table_sql(table, batch.schema().as_ref());
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(table)))
            .with_context(|| format!("dropping table {table}"))?;
        tx.execute_batch(&create)
            .with_context(|| format!("creating table {table}"))?;
        insert_rows(&tx, table, batch)?;
        tx.commit()?;
        debug!(table, rows = batch.num_rows(), "replaced table");
        Ok(())
    }

    /// Insert the batch's rows into an existing table.
    pub fn append_batch(&mut self, table: &str, batch: &RecordBatch) -> Result<()> {
        let tx = self.conn.transaction()?;
        insert_rows(&tx, table, batch)?;
        tx.commit()?;
        debug!(table, rows = batch.num_rows(), "appended batch");
        Ok(())
    }

    pub fn table_rows(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let n = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(n)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map an Arrow type to a SQLite column type. Anything outside the primitive
/// set is stored as TEXT (the column is cast to Utf8 before binding).
fn sqlite_type(dt: &DataType) -> &'static str {
    match dt {
        DataType::Int64 | DataType::Boolean => "INTEGER",
        DataType::Float64 => "REAL",
        _ => "TEXT",
    }
}

fn create_table_sql(table: &str, schema: &Schema) -> String {
    let cols: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{} {}", quote_ident(f.name()), sqlite_type(f.data_type())))
        .collect();
    format!("CREATE TABLE {} ({});", quote_ident(table), cols.join(", "))
}

/// Bring a column into one of the four bindable types (Int64, Float64,
/// Boolean, Utf8); everything else round-trips through a Utf8 cast.
fn normalize_column(col: &ArrayRef) -> Result<ArrayRef> {
    match col.data_type() {
        DataType::Int64 | DataType::Float64 | DataType::Boolean | DataType::Utf8 => {
            Ok(col.clone())
        }
        other => cast(col.as_ref(), &DataType::Utf8)
            .with_context(|| format!("casting {other} column to TEXT")),
    }
}

fn sql_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Integer(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            Value::Integer(arr.value(row) as i64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Value::Real(arr.value(row))
        }
        _ => {
            let arr = col.as_any().downcast_ref::<StringArray>().unwrap();
            Value::Text(arr.value(row).to_string())
        }
    }
}

/// Prepared-statement insert of every row in the batch. Runs inside the
/// caller's transaction (Transaction derefs to Connection).
fn insert_rows(conn: &Connection, table: &str, batch: &RecordBatch) -> Result<()> {
    if batch.num_rows() == 0 {
        return Ok(());
    }

    let schema = batch.schema();
    let col_names: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| quote_ident(f.name()))
        .collect();
    let placeholders = vec!["?"; col_names.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        col_names.join(", "),
        placeholders
    );

    let cols: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(normalize_column)
        .collect::<Result<_>>()?;

    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("preparing insert for {table}"))?;
    for row in 0..batch.num_rows() {
        let values = cols.iter().map(|c| sql_value(c, row));
        stmt.execute(params_from_iter(values))
            .with_context(|| format!("inserting row {row} into {table}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Int32Array;
    use arrow::datatypes::Field;
    use std::sync::Arc;

    fn sample_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
            Field::new("score", DataType::Float64, true),
        ]));
        let ids = Int64Array::from(vec![1, 2, 3]);
        let names = StringArray::from(vec![Some("a"), None, Some("c")]);
        let scores = Float64Array::from(vec![Some(1.5), Some(2.5), None]);
        RecordBatch::try_new(
            schema,
            vec![Arc::new(ids), Arc::new(names), Arc::new(scores)],
        )
        .unwrap()
    }

    #[test]
    fn replace_writes_all_rows_and_nulls() -> Result<()> {
        let mut store = Store::open_in_memory()?;
        store.replace_table("t", &sample_batch())?;

        assert_eq!(store.table_rows("t")?, 3);
        let name: Option<String> =
            store
                .conn()
                .query_row("SELECT name FROM t WHERE id = 2", [], |r| r.get(0))?;
        assert_eq!(name, None);
        let score: f64 =
            store
                .conn()
                .query_row("SELECT score FROM t WHERE id = 1", [], |r| r.get(0))?;
        assert_eq!(score, 1.5);
        Ok(())
    }

    #[test]
    fn replace_is_destructive() -> Result<()> {
        let mut store = Store::open_in_memory()?;
        store.replace_table("t", &sample_batch())?;
        store.replace_table("t", &sample_batch())?;
        // second write replaces, never appends
        assert_eq!(store.table_rows("t")?, 3);
        Ok(())
    }

    #[test]
    fn append_adds_rows() -> Result<()> {
        let mut store = Store::open_in_memory()?;
        store.replace_table("t", &sample_batch())?;
        store.append_batch("t", &sample_batch())?;
        assert_eq!(store.table_rows("t")?, 6);
        Ok(())
    }

    #[test]
    fn empty_batch_creates_empty_table() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![Field::new("x", DataType::Int64, true)]));
        let mut store = Store::open_in_memory()?;
        store.replace_table("t", &RecordBatch::new_empty(schema))?;
        assert_eq!(store.table_rows("t")?, 0);
        Ok(())
    }

    #[test]
    fn non_primitive_columns_land_as_text() -> Result<()> {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int32, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int32Array::from(vec![7])) as ArrayRef],
        )
        .unwrap();

        let mut store = Store::open_in_memory()?;
        store.replace_table("t", &batch)?;
        let (ty, v): (String, String) = store.conn().query_row(
            "SELECT typeof(v), v FROM t",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        assert_eq!(ty, "text");
        assert_eq!(v, "7");
        Ok(())
    }
}
