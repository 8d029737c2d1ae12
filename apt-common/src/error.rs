//! Store and startup errors shared by the APT crates
//!
//! Pipeline failures live in `apt_classifier::ClassifyError`; this enum only
//! covers what `apt-common` itself touches: the SQLite store, the data
//! directory, TOML config and the tracing subscriber.

use thiserror::Error;

/// Common result type for APT operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// SQLite query, connection or pool failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the database directory failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Log filter or subscriber setup failed
    #[error("Logging error: {0}")]
    Logging(String),

    /// A stored row or profile document could not be encoded or decoded
    #[error("Corrupt {what}: {detail}")]
    Corrupt { what: String, detail: String },
}

impl Error {
    pub fn corrupt(what: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        Error::Corrupt {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    /// SQLite busy/locked or pool exhaustion; likely to clear on its own
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            Error::Database(db_err) => {
                let message = db_err.to_string();
                message.contains("database is locked") || message.contains("database is busy")
            }
            _ => false,
        }
    }
}
