use anyhow::Result;
use std::time::Instant;
use tracing::{error, info};
use vendsum::{config::PipelineConfig, ingest, logging, store::Store, summary};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let cfg = PipelineConfig::from_env();
    logging::init(&cfg.log_dir, "pipeline.log")?;
    info!("startup");

    // ─── 2) load base tables ─────────────────────────────────────────
    let start = Instant::now();
    let mut store = Store::open(&cfg.db_path)?;
    let outcome = ingest::load_directory(&mut store, &cfg.data_dir, cfg.batch_rows)?;
    info!(files = outcome.files, rows = outcome.rows, "base tables loaded");

    // ─── 3) build the vendor sales summary ───────────────────────────
    // Loader failures above propagate; the summary pass is the one place
    // with a top-level catch: log the error and stop, no partial rollback.
    match summary::build_vendor_sales_summary(&mut store) {
        Ok(rows) => info!(rows, elapsed = ?start.elapsed(), "pipeline complete"),
        Err(e) => error!("error in processing: {e:#}"),
    }

    Ok(())
}
