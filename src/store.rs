//! Durable settings storage.
//!
//! [`ConfigurationStore`] reads and writes [`Settings`] under a fixed key of a
//! [`Storage`] backend.  Loading never fails: anything unusable in storage
//! degrades to the built-in defaults.  Persisting never fails either; write
//! errors are logged and dropped.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::settings::Settings;

/// Storage key the settings live under.
pub const SETTINGS_KEY: &str = "chatmycv-settings";

/// Name of the per-user directory used by [`FileStorage::default_location`].
const APP_DIR_NAME: &str = "chatmycv";

/// A string key-value store that survives process restarts.
pub trait Storage: Send + Sync {
    /// Returns the value stored under `key`, or `None` if there is none.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Storage that keeps one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Creates storage rooted at `dir`.  The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates storage in the platform configuration directory.
    ///
    /// - Linux: `$XDG_CONFIG_HOME/chatmycv` (defaults to `~/.config/chatmycv`)
    /// - macOS: `~/Library/Application Support/chatmycv`
    /// - Windows: `%APPDATA%\chatmycv`
    pub fn default_location() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            Error::storage(
                "could not determine config directory",
                io::Error::new(io::ErrorKind::NotFound, "no config directory"),
            )
        })?;
        Ok(Self::new(dir.join(APP_DIR_NAME)))
    }

    /// The directory holding the stored files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::storage(
                format!("failed to read {key} from storage"),
                err,
            )),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|err| Error::storage("failed to create storage directory", err))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|err| Error::storage(format!("failed to write {key} to storage"), err))?;
        fs::rename(&tmp, &path)
            .map_err(|err| Error::storage(format!("failed to replace {key} in storage"), err))
    }
}

/// In-process storage; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage pre-populated with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let storage = Self::new();
        storage
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.into(), value.into());
        storage
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and persists [`Settings`] through a [`Storage`] backend.
pub struct ConfigurationStore {
    storage: Box<dyn Storage>,
}

impl ConfigurationStore {
    /// Creates a store over `storage`.
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self {
            storage: Box::new(storage),
        }
    }

    /// Creates a store over process-local memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// Loads settings, merging whatever is stored over the defaults.
    ///
    /// Missing or corrupt storage yields exactly [`Settings::default`].
    pub fn load(&self) -> Settings {
        match self.try_load() {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(err) => {
                tracing::warn!(error = %err, "unable to load settings from storage");
                Settings::default()
            }
        }
    }

    /// Writes every field of `settings`, resolved, under [`SETTINGS_KEY`].
    pub fn persist(&self, settings: &Settings) {
        let result = serde_json::to_string(&settings.clone().resolved())
            .map_err(Error::from)
            .and_then(|json| self.storage.set(SETTINGS_KEY, &json));
        if let Err(err) = result {
            tracing::warn!(error = %err, "unable to persist settings");
        }
    }

    fn try_load(&self) -> Result<Option<Settings>> {
        let Some(raw) = self.storage.get(SETTINGS_KEY)? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&raw).map_err(|err| {
            Error::config_load("stored settings are not valid JSON", Some(Box::new(err)))
        })?;
        match value {
            // A stored `null` carries no settings at all.
            Value::Null => Ok(None),
            Value::Object(stored) => Ok(Some(merge_over_defaults(&stored))),
            other => Err(Error::config_load(
                format!("stored settings are not an object: {other}"),
                None,
            )),
        }
    }
}

fn merge_over_defaults(stored: &Map<String, Value>) -> Settings {
    let mut settings = Settings::default();
    overlay(stored, "backendUrl", &mut settings.backend_url);
    overlay(stored, "lang", &mut settings.lang);
    overlay(stored, "character", &mut settings.character);
    overlay(stored, "temperature", &mut settings.temperature);
    overlay(stored, "k", &mut settings.k);
    overlay(stored, "model", &mut settings.model);
    overlay(stored, "systemPrompt", &mut settings.system_prompt);
    settings.resolved()
}

/// Overwrites `slot` with `stored[key]` when it is present, non-null and well typed.
fn overlay<T: DeserializeOwned>(stored: &Map<String, Value>, key: &str, slot: &mut T) {
    match stored.get(key) {
        None | Some(Value::Null) => {}
        Some(value) => match T::deserialize(value) {
            Ok(parsed) => *slot = parsed,
            Err(err) => tracing::debug!(key, error = %err, "ignoring invalid stored setting"),
        },
    }
}
