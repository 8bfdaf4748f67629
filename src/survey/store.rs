use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::PathBuf,
};

use log::{debug, warn};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use super::content::SECTIONS;

pub const STEP_KEY: &str = "surveyActiveStep";
pub const FORM_DATA_KEY: &str = "surveyFormData";
pub const SCORES_KEY: &str = "surveyScores";
pub const PROGRESS_KEY: &str = "surveyProgress";

const ALL_KEYS: [&str; 4] = [STEP_KEY, FORM_DATA_KEY, SCORES_KEY, PROGRESS_KEY];

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque string key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::write(self.path(key), value).map_err(|source| StoreError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    pub ho_va_ten: String,
    pub ma_so_sinh_vien: String,
    pub gioi_tinh: String,
    pub khoa: String,
    pub nam_hoc: String,
    pub social_media_hours: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WizardState {
    pub active_step: usize,
    pub personal: PersonalInfo,

    /// `"{section}_{ordinal}"` -> option value
    pub answers: BTreeMap<String, String>,

    /// section key -> percentage answered
    pub progress: BTreeMap<String, u8>,
}

/// Mirrors a [`WizardState`] into a [`KeyValueStore`] under four keys.
pub struct FormStore<S> {
    backend: S,
}

impl<S: KeyValueStore> FormStore<S> {
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn save(&mut self, state: &WizardState) -> Result<(), StoreError> {
        self.write(STEP_KEY, &state.active_step)?;
        self.write(FORM_DATA_KEY, &state.personal)?;
        self.write(SCORES_KEY, &state.answers)?;
        self.write(PROGRESS_KEY, &state.progress)
    }

    /// Never fails: a missing or unreadable key falls back to its default
    /// without affecting the other keys.
    pub fn load(&self) -> WizardState {
        let mut active_step: usize = self.read(STEP_KEY);
        if active_step >= SECTIONS.len() {
            warn!(
                "persisted step {} is out of range, restarting at the first step",
                active_step
            );
            active_step = 0;
        }

        WizardState {
            active_step,
            personal: self.read(FORM_DATA_KEY),
            answers: self.read(SCORES_KEY),
            progress: self.read(PROGRESS_KEY),
        }
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        for key in ALL_KEYS {
            self.backend.remove(key)?;
        }
        Ok(())
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(key, &encoded)
    }

    fn read<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = match self.backend.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("no persisted value for '{}'", key);
                return T::default();
            }
            Err(e) => {
                warn!("{}", e);
                return T::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("discarding malformed persisted value for '{}': {}", key, e);
            T::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> WizardState {
        let mut state = WizardState {
            active_step: 3,
            personal: PersonalInfo {
                ho_va_ten: "Nguyễn Văn A".into(),
                ma_so_sinh_vien: "2121050001".into(),
                gioi_tinh: "Nam".into(),
                khoa: "Kinh tế".into(),
                nam_hoc: "3".into(),
                social_media_hours: "2".into(),
            },
            ..Default::default()
        };
        state.answers.insert("I_1".into(), "4".into());
        state.answers.insert("II_2".into(), "5".into());
        state.progress.insert("I".into(), 20);
        state.progress.insert("II".into(), 40);
        state
    }

    #[test]
    fn save_then_load_reproduces_state() {
        let mut store = FormStore::new(MemoryStore::new());
        let state = sample_state();

        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
    }

    #[test]
    fn empty_backend_loads_default() {
        let store = FormStore::new(MemoryStore::new());
        assert_eq!(store.load(), WizardState::default());
    }

    #[test]
    fn corrupt_key_does_not_poison_others() {
        let mut store = FormStore::new(MemoryStore::new());
        let state = sample_state();
        store.save(&state).unwrap();

        store.backend.set(SCORES_KEY, "{not json").unwrap();

        let loaded = store.load();
        assert!(loaded.answers.is_empty());
        assert_eq!(loaded.active_step, state.active_step);
        assert_eq!(loaded.personal, state.personal);
        assert_eq!(loaded.progress, state.progress);
    }

    #[test]
    fn out_of_range_step_restarts() {
        let mut backend = MemoryStore::new();
        backend.set(STEP_KEY, "42").unwrap();

        assert_eq!(FormStore::new(backend).load().active_step, 0);
    }

    #[test]
    fn partial_personal_info_fills_missing_fields() {
        let mut backend = MemoryStore::new();
        backend.set(FORM_DATA_KEY, r#"{"khoa":"Kinh tế"}"#).unwrap();

        let loaded = FormStore::new(backend).load();
        assert_eq!(loaded.personal.khoa, "Kinh tế");
        assert_eq!(loaded.personal.ho_va_ten, "");
    }

    #[test]
    fn clear_removes_every_key() {
        let mut store = FormStore::new(MemoryStore::new());
        store.save(&sample_state()).unwrap();

        store.clear().unwrap();

        for key in ALL_KEYS {
            assert!(store.backend().get(key).unwrap().is_none());
        }
    }

    #[test]
    fn file_store_round_trips_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FormStore::new(FileStore::open(dir.path().join("state")).unwrap());
        let state = sample_state();

        store.save(&state).unwrap();
        let reopened = FormStore::new(FileStore::open(dir.path().join("state")).unwrap());
        assert_eq!(reopened.load(), state);

        store.clear().unwrap();
        assert_eq!(store.load(), WizardState::default());
        // clearing twice is fine
        store.clear().unwrap();
    }
}
