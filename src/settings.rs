use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::audio::ambient::AmbientSound;

/// Sound preferences the sequencer consults when a session first starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundSettings {
    pub chimes_enabled: bool,
    pub ambient: Option<AmbientSound>,
    pub ambient_volume: f32,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            chimes_enabled: true,
            ambient: Some(AmbientSound::OceanSwell),
            ambient_volume: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    sound: SoundSettings,
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
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn sound(&self) -> SoundSettings {
        self.data.read().unwrap().sound.clone()
    }

    pub fn update_sound(&self, settings: SoundSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.sound = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let sound = store.sound();
        assert!(sound.chimes_enabled);
        assert_eq!(sound.ambient, Some(AmbientSound::OceanSwell));
    }

    #[test]
    fn updates_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_sound(SoundSettings {
                chimes_enabled: false,
                ambient: None,
                ambient_volume: 0.2,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        let sound = reloaded.sound();
        assert!(!sound.chimes_enabled);
        assert_eq!(sound.ambient, None);
        assert!((sound.ambient_volume - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn corrupt_file_is_replaced_by_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert!(store.sound().chimes_enabled);
    }
}
