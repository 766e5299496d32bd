//! `SQLite` Contact Store Implementation
//!
//! This module implements the `ContactStore` trait for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/contacts.db`)
//! - In-memory connections (`:memory:`)
//! - Foreign keys enabled per connection (`PRAGMA foreign_keys = ON`)
//! - Idempotent schema bootstrap
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - Generated ids come from `INSERT ... RETURNING id`
//! - Scoped transactions roll back on drop unless committed

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::{CarddexError, Result};
use crate::store::{
    validate_contact_fields, validate_tag_label, BackendType, ConnectionConfig, Contact,
    ContactRecord, ContactStore,
};

/// `SQLite` contact store implementation
///
/// Owns one open connection for the life of the process.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a connection for the given config.
    ///
    /// The config must be for the `SQLite` backend and carry a `file` path
    /// (`:memory:` is accepted). Foreign key enforcement is switched on for
    /// the session so association rows cannot reference missing parents.
    pub fn connect(config: &ConnectionConfig) -> Result<Self> {
        if config.backend != BackendType::SQLite {
            return Err(CarddexError::config(format!(
                "Expected SQLite backend, got {}",
                config.backend
            )));
        }

        let file_path = config
            .file
            .as_ref()
            .ok_or_else(|| CarddexError::config("SQLite requires 'file' parameter"))?;

        let path_str = file_path.to_str().ok_or_else(|| {
            CarddexError::config("SQLite file path contains invalid UTF-8 characters")
        })?;

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path_str, flags).map_err(|e| {
            CarddexError::connection(format!("Failed to open SQLite database: {e}"))
        })?;

        conn.pragma_update(None, "foreign_keys", "ON").map_err(|e| {
            CarddexError::connection(format!("Failed to enable foreign keys: {e}"))
        })?;

        Ok(Self { conn })
    }

    /// Create the contact schema if it does not exist yet.
    ///
    /// Safe to run on every startup. A failure here means the session is
    /// unusable, so it surfaces as a connection error.
    pub fn ensure_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     name TEXT NOT NULL,
                     phone_number TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS tags (
                     id INTEGER PRIMARY KEY AUTOINCREMENT,
                     tag TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS users_tags (
                     user_id INTEGER NOT NULL REFERENCES users (id),
                     tag_id INTEGER NOT NULL REFERENCES tags (id),
                     PRIMARY KEY (user_id, tag_id)
                 );
                 CREATE INDEX IF NOT EXISTS idx_users_name ON users (name);
                 CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_tag ON tags (tag);",
            )
            .map_err(|e| CarddexError::connection(format!("Schema bootstrap failed: {e}")))
    }
}

impl ContactStore for SqliteStore {
    async fn list(&mut self) -> Result<Vec<ContactRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT u.id, u.name, u.phone_number, group_concat(t.tag, ',')
                 FROM users u
                 LEFT JOIN users_tags ut ON ut.user_id = u.id
                 LEFT JOIN tags t ON t.id = ut.tag_id
                 GROUP BY u.id, u.name, u.phone_number
                 ORDER BY u.id ASC",
            )
            .map_err(|e| CarddexError::query(format!("Failed to prepare listing: {e}")))?;

        let records = stmt
            .query_map([], |row| {
                Ok(ContactRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                    tags: row.get(3)?,
                })
            })
            .map_err(|e| CarddexError::query(format!("Failed to list contacts: {e}")))?
            .collect::<std::result::Result<Vec<ContactRecord>, _>>()
            .map_err(|e| CarddexError::query(format!("Failed to read contact row: {e}")))?;

        Ok(records)
    }

    async fn add(&mut self, name: &str, phone: &str) -> Result<Contact> {
        validate_contact_fields(name, phone)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        // Dropping the transaction on the error path rolls the insert back.
        let id: i32 = tx
            .query_row(
                "INSERT INTO users (name, phone_number) VALUES (?1, ?2) RETURNING id",
                params![name, phone],
                |row| row.get(0),
            )
            .map_err(|e| CarddexError::persistence(format!("Failed to insert contact: {e}")))?;

        tx.commit()
            .map_err(|e| CarddexError::persistence(format!("Failed to commit contact: {e}")))?;

        Ok(Contact { id, name: name.to_string(), phone: phone.to_string() })
    }

    async fn update(&mut self, id: i32, name: &str, phone: &str) -> Result<()> {
        validate_contact_fields(name, phone)?;

        let tx = self
            .conn
            .transaction()
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        let affected = tx
            .execute(
                "UPDATE users SET name = ?1, phone_number = ?2 WHERE id = ?3",
                params![name, phone, id],
            )
            .map_err(|e| CarddexError::persistence(format!("Failed to update contact: {e}")))?;

        if affected == 0 {
            return Err(CarddexError::contact_not_found(id));
        }

        tx.commit()
            .map_err(|e| CarddexError::persistence(format!("Failed to commit update: {e}")))
    }

    async fn delete(&mut self, id: i32) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        // Association rows go first so the contact delete never trips the
        // foreign key and no orphaned rows survive.
        tx.execute("DELETE FROM users_tags WHERE user_id = ?1", params![id])
            .map_err(|e| CarddexError::persistence(format!("Failed to delete tag links: {e}")))?;

        let affected = tx
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| CarddexError::persistence(format!("Failed to delete contact: {e}")))?;

        if affected == 0 {
            return Err(CarddexError::contact_not_found(id));
        }

        tx.commit()
            .map_err(|e| CarddexError::persistence(format!("Failed to commit delete: {e}")))
    }

    async fn search_by_name(&mut self, name: &str) -> Result<Vec<Contact>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, phone_number FROM users WHERE name = ?1 ORDER BY id ASC",
            )
            .map_err(|e| CarddexError::query(format!("Failed to prepare search: {e}")))?;

        let contacts = stmt
            .query_map(params![name], |row| {
                Ok(Contact { id: row.get(0)?, name: row.get(1)?, phone: row.get(2)? })
            })
            .map_err(|e| CarddexError::query(format!("Failed to search contacts: {e}")))?
            .collect::<std::result::Result<Vec<Contact>, _>>()
            .map_err(|e| CarddexError::query(format!("Failed to read contact row: {e}")))?;

        Ok(contacts)
    }

    async fn search_by_tag(&mut self, label: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT u.name, u.phone_number
                 FROM users u
                 JOIN users_tags ut ON ut.user_id = u.id
                 JOIN tags t ON t.id = ut.tag_id
                 WHERE t.tag = ?1
                 ORDER BY u.id ASC",
            )
            .map_err(|e| CarddexError::query(format!("Failed to prepare tag search: {e}")))?;

        let pairs = stmt
            .query_map(params![label], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| CarddexError::query(format!("Failed to search by tag: {e}")))?
            .collect::<std::result::Result<Vec<(String, String)>, _>>()
            .map_err(|e| CarddexError::query(format!("Failed to read tag match: {e}")))?;

        Ok(pairs)
    }

    async fn tag(&mut self, contact_id: i32, label: &str) -> Result<i32> {
        validate_tag_label(label)?;

        // Upsert-or-read: the insert returns no row when the label already
        // exists, in which case the id is re-selected.
        let inserted: Option<i32> = self
            .conn
            .query_row(
                "INSERT INTO tags (tag) VALUES (?1) ON CONFLICT (tag) DO NOTHING RETURNING id",
                params![label],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| CarddexError::persistence(format!("Failed to upsert tag: {e}")))?;

        let tag_id = match inserted {
            Some(id) => id,
            None => self
                .conn
                .query_row("SELECT id FROM tags WHERE tag = ?1", params![label], |row| {
                    row.get(0)
                })
                .map_err(|e| CarddexError::query(format!("Failed to resolve tag id: {e}")))?,
        };

        self.conn
            .execute(
                "INSERT INTO users_tags (user_id, tag_id) VALUES (?1, ?2)
                 ON CONFLICT DO NOTHING",
                params![contact_id, tag_id],
            )
            .map_err(|e| CarddexError::persistence(format!("Failed to link tag: {e}")))?;

        Ok(tag_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store() -> SqliteStore {
        let config = ConnectionConfig::sqlite(":memory:".into());
        let store = SqliteStore::connect(&config).expect("Failed to open in-memory store");
        store.ensure_schema().expect("Failed to bootstrap schema");
        store
    }

    #[tokio::test]
    async fn test_connect_wrong_backend() {
        let mut config = ConnectionConfig::sqlite(":memory:".into());
        config.backend = BackendType::Postgres;

        let result = SqliteStore::connect(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Expected SQLite backend"));
    }

    #[tokio::test]
    async fn test_connect_missing_file() {
        let config = ConnectionConfig {
            backend: BackendType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: None,
        };

        let result = SqliteStore::connect(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("SQLite requires 'file' parameter"));
    }

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let store = open_store();
        store.ensure_schema().expect("Second bootstrap must succeed");
    }

    #[tokio::test]
    async fn test_add_and_list_round_trip() {
        let mut store = open_store();

        let contact = store.add("Ann", "555-0100").await.expect("Failed to add");
        assert_eq!(contact.id, 1);
        assert_eq!(contact.name, "Ann");

        let records = store.list().await.expect("Failed to list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, contact.id);
        assert_eq!(records[0].name, "Ann");
        assert_eq!(records[0].phone, "555-0100");
        assert_eq!(records[0].tags, None);
    }

    #[tokio::test]
    async fn test_list_empty_store() {
        let mut store = open_store();
        let records = store.list().await.expect("Failed to list");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_empty_fields() {
        let mut store = open_store();

        assert!(matches!(
            store.add("", "555-0100").await,
            Err(CarddexError::Validation(_))
        ));
        assert!(matches!(
            store.add("Ann", "").await,
            Err(CarddexError::Validation(_))
        ));
        assert!(matches!(
            store.add("  ", "555-0100").await,
            Err(CarddexError::Validation(_))
        ));

        // Rejection must leave no row behind
        let records = store.list().await.expect("Failed to list");
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_single_row() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();
        let bob = store.add("Bob", "555-0200").await.unwrap();

        store.update(ann.id, "Anna", "555-0199").await.expect("Failed to update");

        let records = store.list().await.unwrap();
        assert_eq!(records[0].name, "Anna");
        assert_eq!(records[0].phone, "555-0199");

        // The other row is untouched
        assert_eq!(records[1].id, bob.id);
        assert_eq!(records[1].name, "Bob");
        assert_eq!(records[1].phone, "555-0200");
    }

    #[tokio::test]
    async fn test_update_missing_id_is_not_found() {
        let mut store = open_store();
        store.add("Ann", "555-0100").await.unwrap();

        let result = store.update(99, "Ghost", "000").await;
        assert!(matches!(result, Err(CarddexError::NotFound(_))));

        // No row was altered
        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Ann");
    }

    #[tokio::test]
    async fn test_update_rejects_empty_fields() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();

        let result = store.update(ann.id, "", "555-0100").await;
        assert!(matches!(result, Err(CarddexError::Validation(_))));

        let records = store.list().await.unwrap();
        assert_eq!(records[0].name, "Ann");
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_one_row() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();
        let bob = store.add("Bob", "555-0200").await.unwrap();

        store.delete(ann.id).await.expect("Failed to delete");

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, bob.id);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_not_found() {
        let mut store = open_store();
        store.add("Ann", "555-0100").await.unwrap();

        let result = store.delete(99).await;
        assert!(matches!(result, Err(CarddexError::NotFound(_))));

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_tagged_contact_removes_links() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();
        store.tag(ann.id, "friend").await.unwrap();

        store.delete(ann.id).await.expect("Failed to delete tagged contact");

        let matches = store.search_by_tag("friend").await.unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn test_search_by_name_exact_match_only() {
        let mut store = open_store();
        store.add("Ann", "555-0100").await.unwrap();
        store.add("Ann", "555-0101").await.unwrap();
        store.add("Anna", "555-0200").await.unwrap();

        let found = store.search_by_name("Ann").await.expect("Failed to search");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|c| c.name == "Ann"));

        let missing = store.search_by_name("Zoe").await.expect("Failed to search");
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_tag_reuses_existing_label() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();
        let bob = store.add("Bob", "555-0200").await.unwrap();

        let first = store.tag(ann.id, "friend").await.expect("Failed to tag Ann");
        let second = store.tag(bob.id, "friend").await.expect("Failed to tag Bob");
        assert_eq!(first, second);

        let matches = store.search_by_tag("friend").await.unwrap();
        assert_eq!(
            matches,
            vec![
                ("Ann".to_string(), "555-0100".to_string()),
                ("Bob".to_string(), "555-0200".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_tag_same_contact_twice_is_noop() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();

        store.tag(ann.id, "friend").await.unwrap();
        store.tag(ann.id, "friend").await.expect("Duplicate tagging must not error");

        let matches = store.search_by_tag("friend").await.unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_tag_missing_contact_fails() {
        let mut store = open_store();

        // The foreign key rejects the association row, not application code
        let result = store.tag(99, "friend").await;
        assert!(matches!(result, Err(CarddexError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_tag_rejects_empty_label() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();

        let result = store.tag(ann.id, "  ").await;
        assert!(matches!(result, Err(CarddexError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_aggregates_tags() {
        let mut store = open_store();
        let ann = store.add("Ann", "555-0100").await.unwrap();
        let bob = store.add("Bob", "555-0200").await.unwrap();
        store.tag(ann.id, "friend").await.unwrap();
        store.tag(ann.id, "work").await.unwrap();

        let records = store.list().await.unwrap();
        let ann_tags = records[0].tags.as_deref().expect("Ann must carry tags");
        let mut labels: Vec<&str> = ann_tags.split(',').collect();
        labels.sort_unstable();
        assert_eq!(labels, vec!["friend", "work"]);

        assert_eq!(records[1].id, bob.id);
        assert_eq!(records[1].tags, None);
    }
}
