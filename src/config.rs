//! Configuration management
//!
//! Loaded from a JSON file; every field is optional:
//! ```json
//! {
//!   "database_path": "bank.db",
//!   "max_connections": 5,
//!   "busy_timeout_ms": 5000,
//!   "transfer_timeout_ms": 30000
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Upper bound on pooled connections
    pub max_connections: u32,
    /// How long a connection waits on a locked database before failing
    pub busy_timeout_ms: u64,
    /// Upper bound on a whole transfer, including waiting for the write lock
    pub transfer_timeout_ms: u64,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("bank.db"),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            transfer_timeout_ms: 30_000,
        }
    }
}

impl BankConfig {
    /// Load config from a JSON file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}
