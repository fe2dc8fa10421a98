use aditivos_core::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[cfg(feature = "parquet")]
    #[error("parquet error: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted value that no longer parses into its domain type.
    #[error("corrupt {column} value {value:?}: {reason}")]
    Corrupt {
        column: &'static str,
        value: String,
        reason: String,
    },

    #[error("connection mutex poisoned")]
    Poisoned,
}

impl StoreError {
    #[cfg(feature = "duckdb")]
    pub(crate) fn corrupt(column: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Corrupt {
            column,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Poisoned => RepositoryError::LockPoisoned,
            other => RepositoryError::backend(other),
        }
    }
}
