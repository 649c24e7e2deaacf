//! # Configuration Module
//!
//! Engine configuration and data-directory management. Mixflow stores its
//! durable state (the persisted entropy cache) in the platform-standard data
//! directory:
//!
//! - Linux: `~/.local/share/mixflow/`
//! - macOS: `~/Library/Application Support/mixflow/`
//! - Windows: `%APPDATA%\mixflow\`

use crate::random::RandomConfig;
use crate::selector::SelectorConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the platform-appropriate mixflow data directory, creating it if
/// needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the mixflow
/// subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!("Could not determine system data directory for this platform")
    })?;

    let mixflow_dir = data_dir.join("mixflow");
    fs::create_dir_all(&mixflow_dir).with_context(|| {
        format!(
            "Failed to create mixflow data directory at {}",
            mixflow_dir.display()
        )
    })?;

    Ok(mixflow_dir)
}

/// Default path of the storage database backing the entropy cache.
pub fn get_storage_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("mixflow.db"))
}

/// Full engine configuration: one section per tunable sub-component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub selector: SelectorConfig,
    pub random: RandomConfig,
}

impl EngineConfig {
    /// Load configuration from a JSON file; missing sections fall back to
    /// defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.selector.wildcard_enabled);
        assert_eq!(config.selector.wildcard_interval, 5);
        assert_eq!(config.selector.min_compatibility_score, 5);
        assert_eq!(config.selector.candidate_pool_size, 5);
        assert_eq!(config.random.capacity, 1024);
        assert!(config.random.refill_threshold > 0.0);
    }

    #[test]
    fn partial_config_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"selector": {"wildcard_interval": 7}}"#).unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.selector.wildcard_interval, 7);
        assert_eq!(config.random.capacity, 1024);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.selector.candidate_pool_size, 5);
    }
}
