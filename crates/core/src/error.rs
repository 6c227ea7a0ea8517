//! Error types for the classbatch domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Configuration and naming errors are fatal and raised before anything is
//! written; store errors wrap every failure of the underlying database.

use thiserror::Error;

/// The top-level error type for all classbatch operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // --- Registry errors ---
    #[error("Naming convention violated by class {name:?}: {reason}")]
    NamingConvention { name: String, reason: String },

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl Error {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}
