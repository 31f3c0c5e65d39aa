//! Persistence gateway.
//!
//! State is a pretty-printed JSON file, the audit log a JSONL file, both
//! under the configured data directory. Writes are invoked after every
//! mutation; a failure is logged and retried on the next scheduler tick,
//! never propagated to the caller. In-memory state stays authoritative.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs::{create_dir_all, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use failsafe_common::audit::LogEntry;
use failsafe_common::state::SystemState;

const STATE_FILE: &str = "state.json";
const AUDIT_FILE: &str = "audit.jsonl";

/// File-backed load/store for system state and audit log.
pub struct StateStore {
    data_dir: PathBuf,
}

impl StateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    fn audit_path(&self) -> PathBuf {
        self.data_dir.join(AUDIT_FILE)
    }

    /// Load the persisted system state, or `None` if nothing was stored yet.
    pub async fn load_state(&self) -> Result<Option<SystemState>> {
        let path = self.state_path();
        if !path.exists() {
            info!("No existing state found");
            return Ok(None);
        }

        let contents = read_file(&path).await?;
        let state: SystemState =
            serde_json::from_str(&contents).context("Failed to parse state JSON")?;

        info!("Loaded system state ({})", state.overall_status);
        Ok(Some(state))
    }

    /// Save the system state.
    pub async fn save_state(&self, state: &SystemState) -> Result<()> {
        create_dir_all(&self.data_dir)
            .await
            .context("Failed to create data directory")?;

        let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        write_file(&self.state_path(), &json).await?;

        debug!("Saved system state");
        Ok(())
    }

    /// Load the persisted audit log, newest first. A missing file is an
    /// empty log.
    pub async fn load_log(&self) -> Result<Vec<LogEntry>> {
        let path = self.audit_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let contents = read_file(&path).await?;
        let entries = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("Failed to parse audit entry"))
            .collect::<Result<Vec<LogEntry>>>()?;

        info!("Loaded {} audit entries", entries.len());
        Ok(entries)
    }

    /// Save the full audit log, newest first, one entry per line.
    pub async fn save_log(&self, entries: &[LogEntry]) -> Result<()> {
        create_dir_all(&self.data_dir)
            .await
            .context("Failed to create data directory")?;

        let mut buf = String::new();
        for entry in entries {
            buf.push_str(&serde_json::to_string(entry).context("Failed to serialize audit entry")?);
            buf.push('\n');
        }
        write_file(&self.audit_path(), &buf).await?;

        debug!("Saved {} audit entries", entries.len());
        Ok(())
    }
}

async fn read_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(contents)
}

async fn write_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;

    file.write_all(contents.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe_common::audit::LogSeverity;
    use failsafe_common::state::OverallStatus;

    #[tokio::test]
    async fn test_state_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let mut state = SystemState::default();
        state.overall_status = OverallStatus::Maintenance;
        state.active_protocol = Some("maintenance-mode".to_string());
        state.component_status.insert("vr".to_string(), false);

        store.save_state(&state).await.unwrap();
        let loaded = store.load_state().await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_missing_state_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(store.load_state().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_log_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let entries = vec![
            LogEntry::new("reset", "defaults restored", LogSeverity::Info),
            LogEntry::new("execute_protocol", "maintenance-mode", LogSeverity::Info),
        ];

        store.save_log(&entries).await.unwrap();
        let loaded = store.load_log().await.unwrap();
        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert!(store.load_log().await.unwrap().is_empty());
    }
}
