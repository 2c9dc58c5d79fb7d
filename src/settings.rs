use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::engine::GroupingMode;

pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportSettings {
    /// Stamp grouping mode, group key and variant key on exported records.
    pub include_derived: bool,
    pub batch_size: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            include_derived: false,
            batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub grouping_mode: GroupingMode,
    pub export: ExportSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn snapshot(&self) -> UserSettings {
        self.read().clone()
    }

    pub fn grouping_mode(&self) -> GroupingMode {
        self.read().grouping_mode
    }

    pub fn export(&self) -> ExportSettings {
        self.read().export.clone()
    }

    pub fn update_grouping_mode(&self, mode: GroupingMode) -> Result<()> {
        let mut guard = self.write();
        guard.grouping_mode = mode;
        self.persist(&guard)
    }

    pub fn update_export(&self, settings: ExportSettings) -> Result<()> {
        let mut guard = self.write();
        guard.export = ExportSettings {
            batch_size: settings.batch_size.max(1),
            ..settings
        };
        self.persist(&guard)
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: UserSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid settings in {}", self.path.display()))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    // A panic while holding the lock cannot leave the settings half-written,
    // so a poisoned lock is still safe to use.
    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = SettingsStore::new(dir.path().join("settings.json")).expect("store");
        assert_eq!(store.grouping_mode(), GroupingMode::NamePlusType);
        assert_eq!(store.export(), ExportSettings::default());
    }

    #[test]
    fn updates_persist_across_stores() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("settings.json");

        let store = SettingsStore::new(path.clone()).expect("store");
        store
            .update_grouping_mode(GroupingMode::NameTypePrimitives)
            .expect("mode saved");
        store
            .update_export(ExportSettings {
                include_derived: true,
                batch_size: 0,
            })
            .expect("export saved");

        let reopened = SettingsStore::new(path).expect("reopen");
        assert_eq!(reopened.grouping_mode(), GroupingMode::NameTypePrimitives);
        assert!(reopened.export().include_derived);
        assert_eq!(reopened.export().batch_size, 1);
    }

    #[test]
    fn corrupt_or_partial_files_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");

        fs::write(&path, "{ not json").expect("write");
        let store = SettingsStore::new(path.clone()).expect("store");
        assert_eq!(store.snapshot(), UserSettings::default());

        fs::write(&path, r#"{"groupingMode":"nameOnly"}"#).expect("write");
        store.reload().expect("reload");
        assert_eq!(store.grouping_mode(), GroupingMode::NameOnly);
        assert_eq!(store.export().batch_size, DEFAULT_EXPORT_BATCH_SIZE);
    }
}
