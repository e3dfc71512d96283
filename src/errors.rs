//! Unified error types and result handling.
//!
//! All fallible operations in the crate return [`Result`]. Store failures are
//! wrapped via `#[from]`; business-rule violations get their own variants so
//! callers can match on them.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("{collection} record not found: {id}")]
    NotFound { collection: &'static str, id: String },

    #[error("Unrecognized status value: {value:?}")]
    InvalidStatus { value: String },

    #[error("Illegal status transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },

    #[error("Payment amount {actual} does not match quoted total {expected}")]
    AmountMismatch { expected: f64, actual: f64 },

    #[error("Price option selection is locked for quotation {quotation_id}")]
    SelectionLocked { quotation_id: String },

    #[error("A submission is already in flight for this draft")]
    SubmissionInFlight,
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
