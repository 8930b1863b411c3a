use klausa_core::Table;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("fixture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no row in {table} with id {id}")]
    NotFound { table: Table, id: String },

    #[error("{table} row references missing contract {contract_id}")]
    Orphan { table: Table, contract_id: String },

    #[error("{0}")]
    Other(String),
}
