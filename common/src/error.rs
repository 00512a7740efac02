use crate::schema::reconcile::SchemaConflict;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsvSqlError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("schema conflict on table '{table}':\n{conflict}")]
    SchemaConflict {
        table: String,
        conflict: SchemaConflict,
    },

    #[error("query execution failed: {0}")]
    QueryExecution(#[from] rusqlite::Error),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl From<csv::Error> for CsvSqlError {
    fn from(e: csv::Error) -> Self {
        CsvSqlError::MalformedInput(e.to_string())
    }
}

impl From<reqwest::Error> for CsvSqlError {
    fn from(e: reqwest::Error) -> Self {
        CsvSqlError::ExternalService(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CsvSqlError>;
