//! Daemon configuration persistence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/failsafe/config.json";

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding state.json and audit.jsonl.
    pub data_dir: PathBuf,
    /// Unix socket the RPC server binds to.
    pub socket_path: PathBuf,
    /// Reject protocol execution with an empty reason.
    pub require_reason: bool,
    /// Hex-encoded SHA-256 of the administrator credential. Empty means no
    /// credential is configured and every mutating call is rejected.
    pub credential_sha256: String,
    /// Interval between progressive recovery steps.
    pub progressive_step_minutes: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/failsafe"),
            socket_path: PathBuf::from("/run/failsafe/failsafe.sock"),
            require_reason: true,
            credential_sha256: String::new(),
            progressive_step_minutes: 5,
        }
    }
}

/// Load daemon configuration, writing the default file if none exists.
pub async fn load_config(path: &Path) -> Result<DaemonConfig> {
    if !path.exists() {
        info!("No existing configuration found, creating default");
        let default_config = DaemonConfig::default();
        save_config(path, &default_config).await?;
        return Ok(default_config);
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .context("Failed to open config file")?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .await
        .context("Failed to read config file")?;

    let config: DaemonConfig =
        serde_json::from_str(&contents).context("Failed to parse config JSON")?;

    info!(
        "Loaded configuration (require_reason={}, credential_configured={})",
        config.require_reason,
        !config.credential_sha256.is_empty()
    );
    Ok(config)
}

/// Save daemon configuration to disk.
pub async fn save_config(path: &Path, config: &DaemonConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .await
            .context("Failed to create config directory")?;
    }

    let config_json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .context("Failed to open config file for writing")?;

    file.write_all(config_json.as_bytes())
        .await
        .context("Failed to write config file")?;

    file.sync_all().await.context("Failed to sync config file")?;

    info!("Saved configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_requires_reason() {
        let config = DaemonConfig::default();
        assert!(config.require_reason);
        assert!(config.credential_sha256.is_empty());
        assert_eq!(config.progressive_step_minutes, 5);
    }

    #[tokio::test]
    async fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = DaemonConfig::default();
        config.require_reason = false;
        config.credential_sha256 = "abc123".to_string();

        save_config(&path, &config).await.unwrap();
        let loaded = load_config(&path).await.unwrap();
        assert!(!loaded.require_reason);
        assert_eq!(loaded.credential_sha256, "abc123");
    }

    #[tokio::test]
    async fn test_load_creates_default_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let loaded = load_config(&path).await.unwrap();
        assert!(loaded.require_reason);
        assert!(path.exists());
    }
}
