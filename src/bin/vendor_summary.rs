use anyhow::Result;
use tracing::{error, info};
use vendsum::{config::PipelineConfig, logging, store::Store, summary};

/// Summary-only run against already-populated base tables. Any failure is
/// logged and the run stops; nothing is rolled back.
fn main() -> Result<()> {
    let cfg = PipelineConfig::from_env();
    logging::init(&cfg.log_dir, "vendor_summary.log")?;

    let mut store = Store::open(&cfg.db_path)?;
    match summary::build_vendor_sales_summary(&mut store) {
        Ok(rows) => info!(rows, "completed"),
        Err(e) => error!("error in processing: {e:#}"),
    }
    Ok(())
}
