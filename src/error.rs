use thiserror::Error;

#[derive(Error, Debug)]
pub enum PnlError {
    #[error("Report fetch failed for {month}: {details}")]
    ReportFetch { month: String, details: String },

    #[error("Query failed ({query}): {details}")]
    QueryFailed { query: String, details: String },

    #[error("Store rejected {operation}: {details}")]
    StoreError { operation: String, details: String },

    #[error("Empty history: at least one monthly fact is required")]
    EmptyHistory,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[cfg(feature = "qbo")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PnlError>;
