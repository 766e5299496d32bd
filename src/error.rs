//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout carddex.
//! Operations return these as values; only the menu loop decides what to
//! print, and only connection establishment at startup may end the process.
//!
//! # Error Categories
//! - `Validation`: a required field was empty or malformed
//! - `NotFound`: the operation's target id matched no row
//! - `Persistence`: an insert/update/delete failed
//! - `Query`: a read failed
//! - `Connection`: the database connection could not be established
//! - `Config`: settings or connection-profile resolution failed
//! - `Prompt`: reading operator input from the terminal failed

use thiserror::Error;

/// Main error type for carddex operations
#[derive(Error, Debug)]
pub enum CarddexError {
    /// A required field was empty or malformed
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation's target does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Insert/update/delete failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Read query failed
    #[error("Query failed: {0}")]
    Query(String),

    /// Database connection failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Configuration error (profile not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Terminal prompt could not be read
    #[error("Prompt failed: {0}")]
    Prompt(String),
}

impl CarddexError {
    /// Whether this error may terminate the process.
    ///
    /// Everything except a failed connection must return control to the
    /// menu so the operator can retry.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a not-found error for a contact id
    pub fn contact_not_found(id: i32) -> Self {
        Self::NotFound(format!("no contact with id {id}"))
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create a query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a prompt error
    pub fn prompt(message: impl Into<String>) -> Self {
        Self::Prompt(message.into())
    }
}

/// Result type alias for carddex operations
pub type Result<T> = std::result::Result<T, CarddexError>;
