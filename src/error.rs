use thiserror::Error;

/// Everything the report pipeline can fail with.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A sample arrived without an endpoint label. Dropped, never fatal.
    #[error("invalid sample: {0}")]
    InvalidSample(String),

    /// A log file could not be tokenized at all.
    #[error("failed to parse {source_name}: {message}")]
    MalformedInput {
        source_name: String,
        message: String,
    },

    /// A percentile was queried on an empty accumulator.
    #[error("percentile queried on an empty accumulator")]
    OutOfRange,

    #[error("invalid endpoint key: {0}")]
    InvalidKey(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl ReportError {
    pub fn malformed(source_name: impl Into<String>, message: impl ToString) -> Self {
        Self::MalformedInput {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
