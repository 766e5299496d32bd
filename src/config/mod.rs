//! Configuration Management
//!
//! This module handles loading and saving named connection profiles.
//!
//! # Profile File
//! Profiles live in a single per-user file:
//! `~/.config/carddex/connections.json`.
//!
//! # Resolution Precedence
//! 1. Explicit CLI flags (highest priority, assembled by the binary)
//! 2. Named profile (`--profile`)
//! 3. The registry's default profile
//!
//! Passwords are never stored in the file; a profile references the name of
//! an environment variable (`password_env`) that is resolved at load time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CarddexError, Result};
use crate::store::ConnectionConfig;

/// Stored connection profile
///
/// Similar to `ConnectionConfig` but the password field stays empty in the
/// file; `password_env` names the environment variable that supplies it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredConnection {
    /// Connection configuration
    #[serde(flatten)]
    pub config: ConnectionConfig,

    /// Environment variable name for the password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl StoredConnection {
    /// Resolve environment variables and return a ready `ConnectionConfig`
    pub fn resolve(&self) -> Result<ConnectionConfig> {
        let mut config = self.config.clone();

        if let Some(env_var) = &self.password_env {
            match std::env::var(env_var) {
                Ok(password) => config.password = Some(password),
                Err(_) => {
                    return Err(CarddexError::config(format!(
                        "Environment variable {env_var} not found for password"
                    )));
                }
            }
        }

        Ok(config)
    }
}

/// Connection registry (the profile file contents)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionRegistry {
    /// Named profiles
    pub connections: HashMap<String, StoredConnection>,

    /// Name of the default profile (must exist in the connections map)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ConnectionRegistry {
    /// Look up a profile by name, falling back to the registry default.
    ///
    /// Error messages list the available profile names so the operator can
    /// correct a typo without opening the file.
    pub fn resolve(&self, name: Option<&str>) -> Result<ConnectionConfig> {
        let profile_name = match name {
            Some(n) => n.to_string(),
            None => self
                .default
                .as_ref()
                .ok_or_else(|| {
                    let available: Vec<_> = self.connections.keys().collect();
                    CarddexError::config(format!(
                        "No default profile set. Available profiles: {available:?}. \
                         Specify one with --profile or set a default in the file."
                    ))
                })?
                .clone(),
        };

        let stored = self.connections.get(&profile_name).ok_or_else(|| {
            let available: Vec<_> = self.connections.keys().collect();
            CarddexError::config(format!(
                "Profile '{profile_name}' not found. Available profiles: {available:?}"
            ))
        })?;

        stored.resolve()
    }
}

/// Get path to the profile file (`~/.config/carddex/connections.json`)
pub fn registry_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| CarddexError::config("Could not determine user config directory"))?;

    Ok(config_dir.join("carddex").join("connections.json"))
}

/// Load the connection registry from a profile file
///
/// A missing file is an empty registry, not an error.
pub fn load_registry(path: &Path) -> Result<ConnectionRegistry> {
    if !path.exists() {
        return Ok(ConnectionRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| CarddexError::config(format!("Could not read profile file: {e}")))?;

    serde_json::from_str::<ConnectionRegistry>(&contents)
        .map_err(|e| CarddexError::config(format!("Invalid profile file format: {e}")))
}

/// Save the connection registry to a profile file
pub fn save_registry(path: &Path, registry: &ConnectionRegistry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            CarddexError::config(format!("Could not create config directory: {e}"))
        })?;
    }

    let contents = serde_json::to_string_pretty(registry)
        .map_err(|e| CarddexError::config(format!("Could not serialize profiles: {e}")))?;

    fs::write(path, contents)
        .map_err(|e| CarddexError::config(format!("Could not write profile file: {e}")))
}

/// Resolve a named (or default) profile from the user's profile file
pub fn resolve_profile(name: Option<&str>) -> Result<ConnectionConfig> {
    let registry = load_registry(&registry_path()?)?;
    registry.resolve(name)
}

/// Save a profile under the given name in the user's profile file
///
/// The first profile saved becomes the registry default.
pub fn save_profile(name: &str, stored: StoredConnection) -> Result<()> {
    let path = registry_path()?;
    let mut registry = load_registry(&path)?;

    if registry.default.is_none() {
        registry.default = Some(name.to_string());
    }
    registry.connections.insert(name.to_string(), stored);

    save_registry(&path, &registry)
}
