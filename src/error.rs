use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetching {location} failed with status {status}")]
    Fetch { location: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid table selector: {0}")]
    Selector(String),
}

/// Why a single table row did not become a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowDefect {
    #[error("row rejected by acceptance rules")]
    Rejected,

    #[error("no cell at column {column} for field '{field}'")]
    MissingCell { field: String, column: usize },

    #[error("field '{field}' could not be parsed from '{text}'")]
    Unparsable { field: String, text: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;
