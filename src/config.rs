use std::env;
use std::path::PathBuf;

/// Default number of CSV rows per ingestion batch.
pub const DEFAULT_BATCH_ROWS: usize = 100_000;

/// Paths and sizing for a single pipeline run. No CLI flags; the defaults
/// match the expected on-disk layout and can be overridden via environment
/// variables for tests and ad-hoc runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scanned for `*.csv` input files.
    pub data_dir: PathBuf,
    /// SQLite database file holding the base tables and the summary.
    pub db_path: PathBuf,
    /// Directory for per-run append-only log files.
    pub log_dir: PathBuf,
    /// Rows per ingestion batch.
    pub batch_rows: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: PathBuf::from("data"),
            db_path: PathBuf::from("inventory.db"),
            log_dir: PathBuf::from("logs"),
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }
}

impl PipelineConfig {
    /// Build a config from the environment, falling back to defaults:
    /// `VENDSUM_DATA_DIR`, `VENDSUM_DB`, `VENDSUM_LOG_DIR`, `VENDSUM_BATCH_ROWS`.
    pub fn from_env() -> Self {
        let mut cfg = PipelineConfig::default();
        if let Ok(v) = env::var("VENDSUM_DATA_DIR") {
            cfg.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("VENDSUM_DB") {
            cfg.db_path = PathBuf::from(v);
        }
        if let Ok(v) = env::var("VENDSUM_LOG_DIR") {
            cfg.log_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("VENDSUM_BATCH_ROWS") {
            if let Ok(n) = v.parse::<usize>() {
                if n > 0 {
                    cfg.batch_rows = n;
                }
            }
        }
        cfg
    }
}
