use thiserror::Error;

/// Report engine error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse or serialize error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Client slug not present in the configuration
    #[error("unknown client: {0}")]
    UnknownClient(String),

    /// Input file whose format cannot be detected
    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    /// Dimension buckets disagree with the independently summed totals
    #[error("totals mismatch in {grouping} for {counter}: buckets={buckets}, totals={totals}")]
    TotalsMismatch {
        grouping: String,
        counter: &'static str,
        buckets: i128,
        totals: i128,
    },
}

/// Result type alias for the report engine
pub type Result<T> = std::result::Result<T, ReportError>;
