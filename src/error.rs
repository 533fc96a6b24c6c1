use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployLensError {
    #[error("Malformed record in {origin} at row {row}: {reason}")]
    MalformedRecordError {
        origin: String,
        row: u64,
        reason: String,
    },

    #[error("Missing column '{column}' in {origin}")]
    MissingColumnError { origin: String, column: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Cannot open {path}: {source}")]
    InputFileError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeployLensError>;
