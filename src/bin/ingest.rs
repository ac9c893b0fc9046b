use anyhow::Result;
use std::time::Instant;
use tracing::info;
use vendsum::{config::PipelineConfig, ingest, logging, store::Store};

/// Loader-only run: every CSV in the data directory into its own table.
/// No catch here; any read or write failure exits the process.
fn main() -> Result<()> {
    let cfg = PipelineConfig::from_env();
    logging::init(&cfg.log_dir, "ingest.log")?;

    let start = Instant::now();
    let mut store = Store::open(&cfg.db_path)?;
    let outcome = ingest::load_directory(&mut store, &cfg.data_dir, cfg.batch_rows)?;
    info!(
        files = outcome.files,
        rows = outcome.rows,
        elapsed = ?start.elapsed(),
        "done"
    );
    Ok(())
}
