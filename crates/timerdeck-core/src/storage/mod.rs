mod config;
pub mod database;
pub mod memory;
pub mod queue;

pub use config::{Config, PollConfig, StorageConfig, TimerDefaults};
pub use database::Database;
pub use memory::MemoryStore;
pub use queue::{FlushReport, Persistence, WriteQueue};

use std::path::PathBuf;

use crate::error::{ConfigError, StorageError};

/// Ordered list of group records.
pub const GROUPS_KEY: &str = "GROUPS";
/// Timer ids of the ungrouped list.
pub const SINGLE_TIMER_KEY: &str = "SINGLE_TIMER_DATA";

/// Storage key of one timer's record.
pub fn timer_key(timer_id: &str) -> String {
    format!("timerState_{timer_id}")
}

/// Durable key-value store for JSON values.
///
/// Absent keys read as `Ok(None)`; callers fall back to defaults.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<serde_json::Value>, StorageError>;

    fn set(&self, key: &str, value: &serde_json::Value) -> Result<(), StorageError>;

    fn remove(&self, key: &str) -> Result<(), StorageError>;

    fn clear(&self) -> Result<(), StorageError>;
}

/// Returns `~/.config/timerdeck[-dev]/` based on TIMERDECK_ENV.
///
/// Set TIMERDECK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMERDECK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timerdeck-dev")
    } else {
        base_dir.join("timerdeck")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}
