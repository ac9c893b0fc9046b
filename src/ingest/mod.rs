// src/ingest/mod.rs

use anyhow::{anyhow, Context, Result};
use arrow::csv::{reader::Format, ReaderBuilder};
use arrow::record_batch::RecordBatch;
use glob::glob;
use std::{
    fs::File,
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};
use tracing::{info, warn};

use crate::store::Store;

/// Rows sampled when inferring a file's column types.
const SCHEMA_INFER_ROWS: usize = 1_000;

/// Totals for one ingestion pass.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub files: usize,
    pub rows: u64,
}

/// Load every `*.csv` file under `data_dir` into a same-named table.
/// Files are processed in name order so repeated runs behave identically.
/// Any read or write failure propagates; there is no per-file recovery.
pub fn load_directory(store: &mut Store, data_dir: &Path, batch_rows: usize) -> Result<LoadOutcome> {
    let start = Instant::now();
    let pattern = format!("{}/*.csv", data_dir.display());

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for data directory")? {
        let path = entry?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut outcome = LoadOutcome::default();
    for path in paths {
        let rows = load_csv(store, &path, batch_rows)?;
        info!(file = %path.display(), rows, "ingested");
        outcome.files += 1;
        outcome.rows += rows;
    }

    info!(
        files = outcome.files,
        rows = outcome.rows,
        elapsed = ?start.elapsed(),
        "ingestion complete"
    );
    Ok(outcome)
}

/// Stream one CSV file into the table named after it (extension stripped),
/// in `batch_rows`-sized record batches. The first batch replaces the table;
/// later batches append. Returns the number of rows written.
pub fn load_csv(store: &mut Store, path: &Path, batch_rows: usize) -> Result<u64> {
    let table = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("cannot derive table name from {}", path.display()))?
        .to_string();

    let format = Format::default().with_header(true);
    let mut probe =
        File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let (schema, _) = format
        .infer_schema(&mut probe, Some(SCHEMA_INFER_ROWS))
        .with_context(|| format!("inferring schema for {}", path.display()))?;

    if schema.fields().is_empty() {
        warn!(file = %path.display(), "no columns found, skipping");
        return Ok(0);
    }
    let schema = Arc::new(schema);

    let file = File::open(path)?;
    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(batch_rows)
        .build(file)
        .with_context(|| format!("building CSV reader for {}", path.display()))?;

    let mut rows = 0u64;
    let mut replaced = false;
    for batch in reader {
        let batch = batch.with_context(|| format!("reading {}", path.display()))?;
        rows += batch.num_rows() as u64;
        if replaced {
            store.append_batch(&table, &batch)?;
        } else {
            store.replace_table(&table, &batch)?;
            replaced = true;
        }
    }

    // Header-only file: still (re)create the table, empty.
    if !replaced {
        store.replace_table(&table, &RecordBatch::new_empty(schema))?;
    }
    Ok(rows)
}
