//! Persisted resource state.
//!
//! The state file is the host-side half of the lifecycle contract: it owns
//! the `StateRecord` for every resource across invocations and hands each
//! record to the controller when its resource is applied, read, or destroyed.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use lifecycle::StateRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// All resource records tracked by this host.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StateFile {
    /// Record per resource name
    #[serde(default)]
    pub resources: HashMap<String, StateRecord>,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,
}

impl StateFile {
    /// Default state file location (~/.local/state/commandeer/state.toml)
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home
            .join(".local")
            .join("state")
            .join("commandeer")
            .join("state.toml"))
    }

    /// Load state from disk, or return default if the file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk, refreshing the timestamp
    pub fn save(&mut self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }

        self.last_updated = Utc::now();
        let content = toml::to_string_pretty(&self).context("Failed to serialize state to TOML")?;

        fs::write(path, &content)
            .with_context(|| format!("Failed to write state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    /// Record for a resource, if it has been created
    pub fn get(&self, name: &str) -> Option<&StateRecord> {
        self.resources.get(name)
    }

    /// Store the record produced by a successful create/update
    pub fn insert(&mut self, name: &str, record: StateRecord) {
        self.resources.insert(name.to_string(), record);
    }

    /// Drop a resource after delete completes
    pub fn remove(&mut self, name: &str) -> Option<StateRecord> {
        self.resources.remove(name)
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            last_updated: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lifecycle::{CommandDefinition, ResourceSpec};

    fn sample_record() -> StateRecord {
        let create = CommandDefinition::from_args(["touch", "/tmp/motd"]);
        StateRecord {
            spec: ResourceSpec {
                create: create.clone(),
                update: create,
                diff: None,
                read: None,
                delete: Some(CommandDefinition::from_args(["rm", "-f", "/tmp/motd"])),
                compare: None,
            },
            fingerprint: lifecycle::fingerprint(None).unwrap(),
            stdout: "made\n".to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_default_state_is_empty() {
        let state = StateFile::default();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = StateFile::load(&dir.path().join("state.toml")).unwrap();
        assert!(state.resources.is_empty());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.toml");

        let mut state = StateFile::default();
        state.insert("motd", sample_record());
        state.save(&path).unwrap();

        let reloaded = StateFile::load(&path).unwrap();
        assert_eq!(reloaded.get("motd"), Some(&sample_record()));
    }

    #[test]
    fn test_null_in_compare_survives_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.toml");

        let mut record = sample_record();
        let compare: lifecycle::Value =
            serde_json::from_str(r#"{"endpoint": "https://example.test", "token": null}"#).unwrap();
        record.fingerprint = lifecycle::fingerprint(Some(&compare)).unwrap();
        record.spec.compare = Some(compare);

        let mut state = StateFile::default();
        state.insert("motd", record.clone());
        state.save(&path).unwrap();

        let reloaded = StateFile::load(&path).unwrap();
        assert_eq!(reloaded.get("motd"), Some(&record));
    }

    #[test]
    fn test_remove_drops_record() {
        let mut state = StateFile::default();
        state.insert("motd", sample_record());
        assert!(state.remove("motd").is_some());
        assert!(state.get("motd").is_none());
        assert!(state.remove("motd").is_none());
    }
}
