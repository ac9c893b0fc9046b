pub mod config;
pub mod ingest;
pub mod logging;
pub mod store;
pub mod summary;
