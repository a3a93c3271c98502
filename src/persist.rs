//! Persisted bot state.
//!
//! One JSON document holds the bot settings, the enabled plugin names, each
//! plugin's saved snapshot and the privilege maps. Writes go to a temporary
//! file in the same directory, are fsynced, then renamed over the target.

use crate::bot::{Bot, BotSettings};
use crate::privilege::AuthMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Current on-disk format version.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported state version {0} (expected {STATE_VERSION})")]
    UnsupportedVersion(u32),
}

impl StateError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io_error",
            Self::Json(_) => "json_error",
            Self::UnsupportedVersion(_) => "unsupported_version",
        }
    }
}

/// The persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub version: u32,
    pub nickname: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub command_prefix: Option<String>,
    #[serde(default)]
    pub plugins_enabled: Vec<String>,
    #[serde(default)]
    pub plugin_state: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub privileges: AuthMap,
}

impl StateRecord {
    /// Read a record. `Ok(None)` if the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>, StateError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: Self = serde_json::from_reader(BufReader::new(file))?;
        if record.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(record.version));
        }
        Ok(Some(record))
    }

    /// Write the record atomically.
    pub fn write(&self, path: &Path) -> Result<(), StateError> {
        let temp_path = temp_path_for(path);
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, path)?;
        debug!(path = %path.display(), "State written");
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Bot {
    /// Disable every plugin (capturing their snapshots), then write
    /// everything to `path`.
    ///
    /// Plugins stay disabled afterwards; this is meant for shutdown.
    pub fn save_state(&self, path: &Path) -> Result<(), StateError> {
        let enabled = self.registry().enabled_names();
        for name in &enabled {
            self.registry().disable(name);
        }

        let settings = self.settings();
        let record = StateRecord {
            version: STATE_VERSION,
            nickname: settings.nickname,
            channels: settings.channels,
            command_prefix: settings.command_prefix,
            plugins_enabled: enabled,
            plugin_state: self.registry().saved_states(),
            privileges: self.privileges().read().compacted(),
        };
        record.write(path)?;
        info!(
            path = %path.display(),
            plugins = record.plugins_enabled.len(),
            "State saved"
        );
        Ok(())
    }

    /// Restore state from `path`. Returns `false` if there was nothing
    /// usable there; a missing or unreadable file is not an error.
    pub fn load_state(&self, path: &Path) -> bool {
        match StateRecord::read(path) {
            Ok(Some(record)) => {
                info!(path = %path.display(), "Loading saved state");
                self.restore(record);
                true
            }
            Ok(None) => {
                info!(path = %path.display(), "No saved state, starting fresh");
                false
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    code = e.error_code(),
                    "Ignoring unreadable state file"
                );
                false
            }
        }
    }

    /// Apply a loaded record: settings, privileges, snapshots, then enable
    /// each saved plugin.
    pub fn restore(&self, record: StateRecord) {
        self.set_settings(BotSettings {
            nickname: record.nickname,
            channels: record.channels,
            command_prefix: record.command_prefix,
        });
        *self.privileges().write() = record.privileges;
        self.registry().set_saved_states(record.plugin_state);
        for name in &record.plugins_enabled {
            self.enable_logged(name);
        }
    }

    /// Enable a plugin, logging the outcome whenever it arrives.
    pub fn enable_logged(&self, name: &str) {
        let mut fut = self.registry().enable(name);
        match fut.try_resolve() {
            Some(Ok(_)) => info!(plugin = %name, "Plugin loaded"),
            Some(Err(e)) => error!(plugin = %name, error = %e, "Loading plugin failed"),
            None => {
                debug!(plugin = %name, "Plugin not found yet, waiting");
                let name = name.to_owned();
                tokio::spawn(async move {
                    match fut.await {
                        Ok(_) => info!(plugin = %name, "Plugin loaded"),
                        Err(e) => error!(plugin = %name, error = %e, "Loading plugin failed"),
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> StateRecord {
        let mut privileges = AuthMap::new();
        privileges.grant("alice!*@*", "admin");
        StateRecord {
            version: STATE_VERSION,
            nickname: "slbot".into(),
            channels: vec!["#dev".into()],
            command_prefix: Some("!".into()),
            plugins_enabled: vec!["jira".into()],
            plugin_state: BTreeMap::from([("jira".to_owned(), json!({"jira_instances": []}))]),
            privileges,
        }
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        record().write(&path).unwrap();
        assert_eq!(StateRecord::read(&path).unwrap(), Some(record()));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(StateRecord::read(&dir.path().join("nope.json")).unwrap().is_none());
    }

    #[test]
    fn corrupt_and_future_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(StateRecord::read(&path), Err(StateError::Json(_))));

        let mut future = serde_json::to_value(record()).unwrap();
        future["version"] = json!(2);
        fs::write(&path, future.to_string()).unwrap();
        assert!(matches!(
            StateRecord::read(&path),
            Err(StateError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn temp_path_is_a_sibling() {
        assert_eq!(
            temp_path_for(Path::new("/var/lib/slbot/state.json")),
            PathBuf::from("/var/lib/slbot/state.json.tmp")
        );
    }
}
