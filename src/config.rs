//! Configuration loading and persistence.
//!
//! Handles reading and writing the parabridge configuration file under the
//! platform config directory, with `PARABRIDGE_*` environment variable
//! overrides for scripted and test use.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::fs;

use crate::constants::{DEFAULT_CLIENT_ID, MESH_QUIET_WINDOW, PARAMETER_QUIET_WINDOW};

/// Configuration for a bridge session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Address of the pub/sub broker.
    pub broker_address: String,
    /// Base topic for this project; sub-topics hang off it.
    pub base_topic: String,
    /// Client identifier presented to the broker and used in the status
    /// topic.
    pub client_id: String,
    /// Quiet window for mesh publishes, in milliseconds.
    pub mesh_quiet_ms: u64,
    /// Quiet window for parameter publishes, in milliseconds.
    pub parameter_quiet_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            broker_address: "localhost".to_string(),
            base_topic: "parabridge".to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
            mesh_quiet_ms: MESH_QUIET_WINDOW.as_millis() as u64,
            parameter_quiet_ms: PARAMETER_QUIET_WINDOW.as_millis() as u64,
        }
    }
}

impl Config {
    /// Returns the configuration directory path, creating it if necessary.
    ///
    /// `PARABRIDGE_CONFIG_DIR` overrides the platform default.
    pub fn config_dir() -> Result<PathBuf> {
        let dir = if let Ok(explicit) = std::env::var("PARABRIDGE_CONFIG_DIR") {
            PathBuf::from(explicit)
        } else {
            dirs::config_dir()
                .context("Could not determine config directory")?
                .join("parabridge")
        };
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing or unreadable file falls back to defaults; overrides apply
    /// either way.
    pub fn load() -> Result<Self> {
        let path = Self::config_dir()?.join("config.json");
        let mut config = Self::load_from_path(&path).unwrap_or_default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Persists the current configuration to the config directory.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_dir()?.join("config.json");
        self.save_to_path(&path)
    }

    /// Persists the current configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;

        // Restrictive permissions (owner read/write only)
        #[cfg(unix)]
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(broker) = std::env::var("PARABRIDGE_BROKER") {
            self.broker_address = broker;
        }
        if let Ok(base_topic) = std::env::var("PARABRIDGE_BASE_TOPIC") {
            self.base_topic = base_topic;
        }
        if let Ok(client_id) = std::env::var("PARABRIDGE_CLIENT_ID") {
            self.client_id = client_id;
        }
        if let Ok(quiet) = std::env::var("PARABRIDGE_MESH_QUIET_MS") {
            if let Ok(ms) = quiet.parse::<u64>() {
                self.mesh_quiet_ms = ms;
            }
        }
        if let Ok(quiet) = std::env::var("PARABRIDGE_PARAMETER_QUIET_MS") {
            if let Ok(ms) = quiet.parse::<u64>() {
                self.parameter_quiet_ms = ms;
            }
        }
    }

    /// Mesh publish quiet window as a [`Duration`].
    #[must_use]
    pub fn mesh_quiet(&self) -> Duration {
        Duration::from_millis(self.mesh_quiet_ms)
    }

    /// Parameter publish quiet window as a [`Duration`].
    #[must_use]
    pub fn parameter_quiet(&self) -> Duration {
        Duration::from_millis(self.parameter_quiet_ms)
    }
}
