//! Carddex - Console Address-Book Manager
//!
//! Carddex is a small console-driven address-book manager backed by a
//! relational database. An interactive numbered menu drives a fixed CRUD
//! surface: list, add, update, delete, search by name, search by tag, plus
//! tagging of contacts.
//!
//! # Core Principles
//! - One store object owns one connection; it is constructed at startup and
//!   threaded through every operation (no ambient globals)
//! - Every multi-statement mutation runs in a scoped transaction
//! - Operations return typed errors; the menu prints them and keeps serving
//! - Only connection establishment at startup may end the process
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`store`] - Contact store trait and backend implementations
//! - [`config`] - Connection profile management
//! - [`menu`] - Interactive menu loop
//!
//! # Public API
//! - Core types: [`Contact`], [`ContactRecord`], [`ConnectionConfig`], etc.
//! - Errors: [`CarddexError`]
//! - Functions: profile resolution and persistence

pub mod config; // Connection profile management
pub mod error; // Error handling infrastructure
pub mod menu; // Interactive menu loop
pub mod store; // Contact store trait and backend implementations

// Re-export commonly used types for convenience
pub use config::{load_registry, resolve_profile, save_profile, ConnectionRegistry, StoredConnection};
pub use error::{CarddexError, Result};
pub use store::{BackendType, ConnectionConfig, Contact, ContactRecord, ContactStore};
