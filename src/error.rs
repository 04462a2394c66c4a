use thiserror::Error;

/// Errors raised by fold assignment, the metrics, and table I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or insufficient configuration or data.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A NaN or infinite value in a validated metric argument.
    #[error("non-finite value in `{argument}` at index {index}")]
    NonFiniteInput {
        argument: &'static str,
        index: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
