use std::path::PathBuf;

use tracing::warn;

use warden_core::proto::BackupSettings;

use crate::error::BackupError;

/// Durable storage for the single [`BackupSettings`] record. Pretty JSON so
/// an operator can read and hand-edit it.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `None` when no record exists yet or the stored one is unusable; the
    /// caller falls back to defaults either way. A corrupt record is worth a
    /// warning but never worth refusing to start.
    pub fn load(&self) -> Option<BackupSettings> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(value) => value,
            Err(_) => return None,
        };

        let settings = match serde_json::from_str::<BackupSettings>(&content) {
            Ok(value) => value,
            Err(err) => {
                warn!("ignoring unreadable backup settings at {}: {err}", self.path.display());
                return None;
            }
        };

        if let Err(err) = settings.validate() {
            warn!("ignoring stored backup settings: {err}");
            return None;
        }
        Some(settings)
    }

    /// Synchronous persist, called on every settings mutation. Writes to a
    /// temp name and renames so a crash mid-write cannot corrupt the record.
    pub fn save(&self, settings: &BackupSettings) -> Result<(), BackupError> {
        let payload = serde_json::to_string_pretty(settings)
            .map_err(|err| BackupError::Persist(std::io::Error::other(err)))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(BackupError::Persist)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload).map_err(BackupError::Persist)?;
        std::fs::rename(&tmp, &self.path).map_err(|err| {
            let _ = std::fs::remove_file(&tmp);
            BackupError::Persist(err)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::proto::{BackupInterval, TimeOfDay};

    #[test]
    fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(tmp.path().join("backup_settings.json"));

        let settings = BackupSettings {
            enabled: true,
            interval: BackupInterval::Weekly,
            time: TimeOfDay::new(4, 30).unwrap(),
            keep_count: 12,
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load(), Some(settings));
    }

    #[test]
    fn missing_record_loads_as_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(tmp.path().join("backup_settings.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn out_of_range_or_corrupt_records_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("backup_settings.json");
        let store = SettingsStore::new(path.clone());

        std::fs::write(
            &path,
            r#"{"enabled":true,"interval":"daily","time":"03:00","keep_count":0}"#,
        )
        .unwrap();
        assert_eq!(store.load(), None);

        std::fs::write(&path, "not json at all").unwrap();
        assert_eq!(store.load(), None);
    }
}
