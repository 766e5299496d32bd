//! Carddex CLI Entry Point
//!
//! Resolves connection settings from flags or a saved profile, establishes
//! the one database connection the session uses, bootstraps the schema, and
//! hands control to the interactive menu.
//!
//! Connection establishment is the only fatal failure; every later error is
//! printed by the menu loop and the session continues.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carddex::config::{self, StoredConnection};
use carddex::menu;
use carddex::store::{BackendType, ConnectionConfig};

#[cfg(feature = "postgres")]
use carddex::store::postgres::PostgresStore;
#[cfg(feature = "sqlite")]
use carddex::store::sqlite::SqliteStore;

/// Carddex - console address-book manager
#[derive(Parser)]
#[command(name = "carddex")]
#[command(about = "Console address-book manager over PostgreSQL or SQLite")]
#[command(version)]
struct Cli {
    /// Storage backend
    #[arg(long, default_value = "postgres")]
    backend: BackendType,

    /// Database server hostname (postgres)
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Database server port (postgres)
    #[arg(long, default_value_t = 5432)]
    port: u16,

    /// Database user (postgres)
    #[arg(long, default_value = "postgres")]
    user: String,

    /// Environment variable holding the database password (postgres)
    #[arg(long, default_value = "CARDDEX_PASSWORD")]
    password_env: String,

    /// Database name (postgres)
    #[arg(long, default_value = "contacts")]
    database: String,

    /// Database file path (sqlite)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Use a saved connection profile instead of the flags above
    #[arg(long, conflicts_with_all = ["backend", "host", "port", "user", "password_env", "database", "file"])]
    profile: Option<String>,

    /// Save the given flags as a named profile before connecting
    #[arg(long, conflicts_with = "profile")]
    save_profile: Option<String>,
}

impl Cli {
    /// Assemble a stored profile from the flags (password stays an env
    /// reference, never a value).
    fn to_stored(&self) -> anyhow::Result<StoredConnection> {
        let config = match self.backend {
            BackendType::Postgres => ConnectionConfig {
                backend: BackendType::Postgres,
                host: Some(self.host.clone()),
                port: Some(self.port),
                user: Some(self.user.clone()),
                password: None,
                database: Some(self.database.clone()),
                file: None,
            },
            BackendType::SQLite => {
                let file = self
                    .file
                    .clone()
                    .context("SQLite backend requires --file")?;
                ConnectionConfig::sqlite(file)
            }
        };

        let password_env = match self.backend {
            BackendType::Postgres => Some(self.password_env.clone()),
            BackendType::SQLite => None,
        };

        Ok(StoredConnection { config, password_env })
    }

    /// Resolve the effective connection settings
    fn resolve(&self) -> anyhow::Result<ConnectionConfig> {
        if let Some(name) = &self.profile {
            return Ok(config::resolve_profile(Some(name))?);
        }
        Ok(self.to_stored()?.resolve()?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carddex=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Some(name) = &cli.save_profile {
        config::save_profile(name, cli.to_stored()?)?;
        tracing::info!(profile = %name, "saved connection profile");
    }

    let settings = cli.resolve()?;

    match settings.backend {
        #[cfg(feature = "postgres")]
        BackendType::Postgres => {
            let mut store = PostgresStore::connect(&settings)
                .await
                .context("could not establish database connection")?;
            store.ensure_schema().await.context("could not bootstrap schema")?;

            tracing::info!(backend = %settings.backend, "connected");
            println!("Connected to the database!");

            menu::run(&mut store).await?;
        }

        #[cfg(feature = "sqlite")]
        BackendType::SQLite => {
            let mut store = SqliteStore::connect(&settings)
                .context("could not establish database connection")?;
            store.ensure_schema().context("could not bootstrap schema")?;

            tracing::info!(backend = %settings.backend, "connected");
            println!("Connected to the database!");

            menu::run(&mut store).await?;
        }

        #[allow(unreachable_patterns)]
        other => anyhow::bail!("backend '{other}' is not compiled into this binary"),
    }

    Ok(())
}
