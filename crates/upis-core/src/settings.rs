//! Key-value settings stores.
//!
//! `FilePreferences` keeps one JSON object per namespace on disk and reads it
//! on every lookup, so edits by another process take effect on the next
//! message without a restart.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde_json::{Map, Value};
use tracing::warn;

use crate::{ports::SettingsStore, Result};

/// Settings key for the SMS announcement toggle.
pub const SMS_ENABLED_KEY: &str = "sms_enabled";

#[derive(Clone, Debug)]
pub struct FilePreferences {
    dir: PathBuf,
}

impl FilePreferences {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    pub fn set_bool(&self, namespace: &str, key: &str, value: bool) -> Result<()> {
        let path = self.path_for(namespace);
        let mut map = read_map(&path).unwrap_or_default();
        map.insert(key.to_string(), Value::Bool(value));

        fs::create_dir_all(&self.dir)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&Value::Object(map))?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

fn read_map(path: &Path) -> Option<Map<String, Value>> {
    let txt = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<Value>(&txt) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => {
            warn!("Preferences file {} is not a JSON object", path.display());
            None
        }
        Err(e) => {
            warn!("Failed to parse preferences {}: {e}", path.display());
            None
        }
    }
}

impl SettingsStore for FilePreferences {
    fn get_bool(&self, namespace: &str, key: &str, default: bool) -> bool {
        read_map(&self.path_for(namespace))
            .and_then(|map| map.get(key).and_then(Value::as_bool))
            .unwrap_or(default)
    }
}

/// In-memory settings, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<(String, String), bool>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_bool(&self, namespace: &str, key: &str, value: bool) {
        if let Ok(mut values) = self.values.lock() {
            values.insert((namespace.to_string(), key.to_string()), value);
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_bool(&self, namespace: &str, key: &str, default: bool) -> bool {
        self.values
            .lock()
            .ok()
            .and_then(|values| {
                values
                    .get(&(namespace.to_string(), key.to_string()))
                    .copied()
            })
            .unwrap_or(default)
    }
}
