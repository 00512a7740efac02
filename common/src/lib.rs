pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod output;
pub mod schema;
pub mod tracing;

pub use config::Config;
pub use error::{CsvSqlError, Result};
