//! Contact Store Trait and Core Types
//!
//! This module defines the core abstractions for contact storage backends.
//! Each backend (`PostgreSQL`, `SQLite`) implements the `ContactStore` trait.
//!
//! # Stateful Design
//! A store owns one open connection for the life of the process. Each trait
//! method performs one database round trip; multi-statement mutations run
//! inside a scoped transaction whose drop rolls back unless committed.
//!
//! # Backend Isolation
//! Each backend implementation is completely independent.
//! No shared SQL helpers or cross-backend abstractions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{CarddexError, Result};

// Backend-specific implementations
#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Supported storage backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// `PostgreSQL` database
    Postgres,
    /// `SQLite` database
    SQLite,
}

impl BackendType {
    /// Get the backend name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::SQLite => "sqlite",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "postgres" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::SQLite),
            other => Err(format!("unknown backend '{other}' (expected 'postgres' or 'sqlite')")),
        }
    }
}

/// Connection configuration for storage backends
///
/// Fields are backend-specific (e.g., `file` only applies to `SQLite`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Storage backend type
    pub backend: BackendType,

    /// Hostname (postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number (postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password (postgres)
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Database name (postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Database file path (sqlite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub const fn postgres(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            backend: BackendType::Postgres,
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            database: Some(database),
            file: None,
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self {
            backend: BackendType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: Some(file),
        }
    }
}

/// A stored contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Generated row id, immutable once assigned
    pub id: i32,

    /// Contact name
    pub name: String,

    /// Contact phone number
    pub phone: String,
}

/// A listing row: a contact with its aggregated tag labels
///
/// `tags` is the comma-joined label aggregate produced by the listing query,
/// `None` when the contact has no tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Generated row id
    pub id: i32,

    /// Contact name
    pub name: String,

    /// Contact phone number
    pub phone: String,

    /// Comma-joined tag labels, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Validate the required contact fields before any transaction opens.
///
/// Both fields are required; surrounding whitespace does not count as
/// content. Rejection here guarantees no transaction is begun for input
/// that can never be stored.
pub fn validate_contact_fields(name: &str, phone: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CarddexError::validation("name must not be empty"));
    }
    if phone.trim().is_empty() {
        return Err(CarddexError::validation("phone number must not be empty"));
    }
    Ok(())
}

/// Validate a tag label before touching the tags table.
pub fn validate_tag_label(label: &str) -> Result<()> {
    if label.trim().is_empty() {
        return Err(CarddexError::validation("tag label must not be empty"));
    }
    Ok(())
}

/// Contact store trait
///
/// Both storage backends implement this trait. A store owns one open
/// connection; methods take `&mut self` because multi-statement mutations
/// need exclusive use of it for their transaction scope.
pub trait ContactStore {
    /// List all contacts ordered by id ascending, each joined with its
    /// aggregated tag labels when tags exist.
    ///
    /// An empty store is an empty vector, not an error.
    fn list(&mut self) -> impl std::future::Future<Output = Result<Vec<ContactRecord>>> + Send;

    /// Insert a new contact and return it with its generated id.
    ///
    /// Rejects empty name or phone with `Validation` before a transaction
    /// opens. The insert runs inside a transaction; on failure the
    /// transaction rolls back and no partial row remains.
    fn add(
        &mut self,
        name: &str,
        phone: &str,
    ) -> impl std::future::Future<Output = Result<Contact>> + Send;

    /// Overwrite name and phone for the contact with the given id.
    ///
    /// Runs inside a transaction; zero affected rows maps to `NotFound`
    /// and leaves prior values intact.
    fn update(
        &mut self,
        id: i32,
        name: &str,
        phone: &str,
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Remove the contact row and its association rows.
    ///
    /// Both deletes run in one transaction. Zero affected contact rows
    /// maps to `NotFound`.
    fn delete(&mut self, id: i32) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Exact-match lookup by name. Zero matches is a normal empty result.
    fn search_by_name(
        &mut self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Contact>>> + Send;

    /// All (name, phone) pairs of contacts carrying the given tag label.
    fn search_by_tag(
        &mut self,
        label: &str,
    ) -> impl std::future::Future<Output = Result<Vec<(String, String)>>> + Send;

    /// Associate a contact with a tag label, creating the tag on first use.
    ///
    /// Upsert-or-read: insert the label with do-nothing-on-conflict
    /// returning the id; when no row comes back, re-select the id by label.
    /// Returns the tag id. Re-tagging with an already-associated label is a
    /// no-op. Runs outside any contact transaction; a failure here never
    /// rolls back a previously committed contact.
    fn tag(
        &mut self,
        contact_id: i32,
        label: &str,
    ) -> impl std::future::Future<Output = Result<i32>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_type_serialization() {
        assert_eq!(serde_json::to_string(&BackendType::Postgres).unwrap(), r#""postgres""#);
        assert_eq!(serde_json::to_string(&BackendType::SQLite).unwrap(), r#""sqlite""#);
    }

    #[test]
    fn test_backend_type_from_str() {
        assert_eq!("postgres".parse::<BackendType>().unwrap(), BackendType::Postgres);
        assert_eq!("sqlite".parse::<BackendType>().unwrap(), BackendType::SQLite);
        assert!("mysql".parse::<BackendType>().is_err());
    }

    #[test]
    fn test_connection_config_constructors() {
        let pg_config = ConnectionConfig::postgres(
            "localhost".to_string(),
            5432,
            "user".to_string(),
            "pass".to_string(),
            "contacts".to_string(),
        );
        assert_eq!(pg_config.backend, BackendType::Postgres);
        assert_eq!(pg_config.port, Some(5432));
        assert!(pg_config.file.is_none());

        let sqlite_config = ConnectionConfig::sqlite(PathBuf::from("/tmp/contacts.db"));
        assert_eq!(sqlite_config.backend, BackendType::SQLite);
        assert!(sqlite_config.file.is_some());
        assert!(sqlite_config.host.is_none());
    }

    #[test]
    fn test_validate_contact_fields() {
        assert!(validate_contact_fields("Ann", "555-0100").is_ok());
        assert!(validate_contact_fields("", "555-0100").is_err());
        assert!(validate_contact_fields("Ann", "").is_err());
        assert!(validate_contact_fields("   ", "555-0100").is_err());
        assert!(validate_contact_fields("Ann", "  \t").is_err());
    }

    #[test]
    fn test_validate_tag_label() {
        assert!(validate_tag_label("friend").is_ok());
        assert!(validate_tag_label("").is_err());
        assert!(validate_tag_label("  ").is_err());
    }
}
