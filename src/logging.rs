use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber, writing to an append-only log file under
/// `log_dir`. Each entry point passes its own file name, so separate runs of
/// the loader and the summary builder accumulate in separate logs.
///
/// Filter comes from `RUST_LOG`, defaulting to `info`.
pub fn init(log_dir: &Path, file_name: &str) -> Result<()> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let path = log_dir.join(file_name);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_ansi(false)
        .with_writer(Arc::new(file))
        .init();

    Ok(())
}
