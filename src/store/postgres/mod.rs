//! `PostgreSQL` Contact Store Implementation
//!
//! This module implements the `ContactStore` trait for `PostgreSQL` databases.
//!
//! # Features
//! - Client-server connections via TCP
//! - Idempotent schema bootstrap (SERIAL ids)
//! - Scoped transactions via `tokio_postgres::Transaction`
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - The connection driver task is spawned once at connect time and lives
//!   as long as the client
//! - Connection errors are not logged to prevent credential leakage

use tokio_postgres::{Client, Config, NoTls};

use crate::error::{CarddexError, Result};
use crate::store::{
    validate_contact_fields, validate_tag_label, BackendType, ConnectionConfig, Contact,
    ContactRecord, ContactStore,
};

/// `PostgreSQL` contact store implementation
///
/// Owns one client for the life of the process; the wire connection is
/// driven by a background task spawned at connect time.
#[derive(Debug)]
pub struct PostgresStore {
    client: Client,
}

impl PostgresStore {
    /// Connect to the configured server.
    ///
    /// This is the one operation whose failure is allowed to end the
    /// process: without a connection there is nothing to serve.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        if config.backend != BackendType::Postgres {
            return Err(CarddexError::config(format!(
                "Expected PostgreSQL backend, got {}",
                config.backend
            )));
        }

        let pg_config = build_pg_config(config)?;

        let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
            CarddexError::connection(format!("Failed to connect to PostgreSQL: {e}"))
        })?;

        // Drive the wire connection until the client drops.
        tokio::spawn(async move {
            let _ = connection.await;
        });

        Ok(Self { client })
    }

    /// Create the contact schema if it does not exist yet.
    ///
    /// Safe to run on every startup. A failure here means the session is
    /// unusable, so it surfaces as a connection error.
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS users (
                     id SERIAL PRIMARY KEY,
                     name TEXT NOT NULL,
                     phone_number TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS tags (
                     id SERIAL PRIMARY KEY,
                     tag TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS users_tags (
                     user_id INT NOT NULL REFERENCES users (id),
                     tag_id INT NOT NULL REFERENCES tags (id),
                     PRIMARY KEY (user_id, tag_id)
                 );
                 CREATE INDEX IF NOT EXISTS idx_users_name ON users (name);
                 CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_tag ON tags (tag);",
            )
            .await
            .map_err(|e| CarddexError::connection(format!("Schema bootstrap failed: {e}")))
    }
}

impl ContactStore for PostgresStore {
    async fn list(&mut self) -> Result<Vec<ContactRecord>> {
        let rows = self
            .client
            .query(
                "SELECT u.id, u.name, u.phone_number,
                        string_agg(t.tag, ',' ORDER BY t.tag)
                 FROM users u
                 LEFT JOIN users_tags ut ON ut.user_id = u.id
                 LEFT JOIN tags t ON t.id = ut.tag_id
                 GROUP BY u.id, u.name, u.phone_number
                 ORDER BY u.id ASC",
                &[],
            )
            .await
            .map_err(|e| CarddexError::query(format!("Failed to list contacts: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| ContactRecord {
                id: row.get(0),
                name: row.get(1),
                phone: row.get(2),
                tags: row.get(3),
            })
            .collect())
    }

    async fn add(&mut self, name: &str, phone: &str) -> Result<Contact> {
        validate_contact_fields(name, phone)?;

        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        // Dropping the transaction on the error path rolls the insert back.
        let row = tx
            .query_one(
                "INSERT INTO users (name, phone_number) VALUES ($1, $2) RETURNING id",
                &[&name, &phone],
            )
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to insert contact: {e}")))?;

        tx.commit()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to commit contact: {e}")))?;

        Ok(Contact { id: row.get(0), name: name.to_string(), phone: phone.to_string() })
    }

    async fn update(&mut self, id: i32, name: &str, phone: &str) -> Result<()> {
        validate_contact_fields(name, phone)?;

        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        let affected = tx
            .execute(
                "UPDATE users SET name = $1, phone_number = $2 WHERE id = $3",
                &[&name, &phone, &id],
            )
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to update contact: {e}")))?;

        if affected == 0 {
            return Err(CarddexError::contact_not_found(id));
        }

        tx.commit()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to commit update: {e}")))
    }

    async fn delete(&mut self, id: i32) -> Result<()> {
        let tx = self
            .client
            .transaction()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to begin transaction: {e}")))?;

        // Association rows go first so the contact delete never trips the
        // foreign key and no orphaned rows survive.
        tx.execute("DELETE FROM users_tags WHERE user_id = $1", &[&id])
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to delete tag links: {e}")))?;

        let affected = tx
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to delete contact: {e}")))?;

        if affected == 0 {
            return Err(CarddexError::contact_not_found(id));
        }

        tx.commit()
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to commit delete: {e}")))
    }

    async fn search_by_name(&mut self, name: &str) -> Result<Vec<Contact>> {
        let rows = self
            .client
            .query(
                "SELECT id, name, phone_number FROM users WHERE name = $1 ORDER BY id ASC",
                &[&name],
            )
            .await
            .map_err(|e| CarddexError::query(format!("Failed to search contacts: {e}")))?;

        Ok(rows
            .iter()
            .map(|row| Contact { id: row.get(0), name: row.get(1), phone: row.get(2) })
            .collect())
    }

    async fn search_by_tag(&mut self, label: &str) -> Result<Vec<(String, String)>> {
        let rows = self
            .client
            .query(
                "SELECT u.name, u.phone_number
                 FROM users u
                 JOIN users_tags ut ON ut.user_id = u.id
                 JOIN tags t ON t.id = ut.tag_id
                 WHERE t.tag = $1
                 ORDER BY u.id ASC",
                &[&label],
            )
            .await
            .map_err(|e| CarddexError::query(format!("Failed to search by tag: {e}")))?;

        Ok(rows.iter().map(|row| (row.get(0), row.get(1))).collect())
    }

    async fn tag(&mut self, contact_id: i32, label: &str) -> Result<i32> {
        validate_tag_label(label)?;

        // Upsert-or-read: the insert returns no row when the label already
        // exists, in which case the id is re-selected.
        let inserted = self
            .client
            .query_opt(
                "INSERT INTO tags (tag) VALUES ($1) ON CONFLICT (tag) DO NOTHING RETURNING id",
                &[&label],
            )
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to upsert tag: {e}")))?;

        let tag_id: i32 = match inserted {
            Some(row) => row.get(0),
            None => self
                .client
                .query_one("SELECT id FROM tags WHERE tag = $1", &[&label])
                .await
                .map_err(|e| CarddexError::query(format!("Failed to resolve tag id: {e}")))?
                .get(0),
        };

        self.client
            .execute(
                "INSERT INTO users_tags (user_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
                &[&contact_id, &tag_id],
            )
            .await
            .map_err(|e| CarddexError::persistence(format!("Failed to link tag: {e}")))?;

        Ok(tag_id)
    }
}

/// Build a `tokio_postgres` config from the connection parameters
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| CarddexError::config("PostgreSQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| CarddexError::config("PostgreSQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| CarddexError::config("PostgreSQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| CarddexError::config("PostgreSQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| CarddexError::config("PostgreSQL requires 'database' parameter"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(port).user(user).password(password).dbname(database);

    Ok(pg_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> ConnectionConfig {
        ConnectionConfig::postgres(
            "localhost".to_string(),
            5432,
            "postgres".to_string(),
            "secret".to_string(),
            "contacts".to_string(),
        )
    }

    #[test]
    fn test_build_pg_config_complete() {
        let config = full_config();
        assert!(build_pg_config(&config).is_ok());
    }

    #[test]
    fn test_build_pg_config_missing_fields() {
        for strip in ["host", "port", "user", "password", "database"] {
            let mut config = full_config();
            match strip {
                "host" => config.host = None,
                "port" => config.port = None,
                "user" => config.user = None,
                "password" => config.password = None,
                _ => config.database = None,
            }

            let result = build_pg_config(&config);
            assert!(result.is_err(), "missing '{strip}' must be rejected");
            assert!(result.unwrap_err().to_string().contains(strip));
        }
    }

    #[tokio::test]
    async fn test_connect_wrong_backend() {
        let mut config = full_config();
        config.backend = BackendType::SQLite;

        let result = PostgresStore::connect(&config).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Expected PostgreSQL backend"));
    }
}
