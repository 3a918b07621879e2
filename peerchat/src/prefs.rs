//! Local preference store.
//!
//! String key-value storage backed by a TOML file in the user config
//! directory. Tolerant of absence: without a config directory, or with an
//! unreadable file, reads return `None` and writes are dropped. The
//! session core never consults it — the surrounding app uses it to
//! remember the last connected peer.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Key-value preference store over a TOML file.
#[derive(Debug, Clone)]
pub struct PrefStore {
    /// Backing file, or `None` when no config directory is available.
    path: Option<PathBuf>,
}

impl PrefStore {
    /// Store at the default location (`~/.config/peerchat/prefs.toml`).
    #[must_use]
    pub fn open_default() -> Self {
        Self {
            path: dirs::config_dir().map(|d| d.join("peerchat").join("prefs.toml")),
        }
    }

    /// Store backed by an explicit file.
    #[must_use]
    pub const fn at(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    /// Read a preference, `None` when absent or unavailable.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.read_all().remove(key)
    }

    /// Write a preference. Failures are logged and dropped.
    pub fn set(&self, key: &str, value: &str) {
        let mut all = self.read_all();
        all.insert(key.to_string(), value.to_string());
        self.write_all(&all);
    }

    /// Remove a preference. Failures are logged and dropped.
    pub fn remove(&self, key: &str) {
        let mut all = self.read_all();
        if all.remove(key).is_some() {
            self.write_all(&all);
        }
    }

    /// Load the full map, treating any failure as empty.
    fn read_all(&self) -> BTreeMap<String, String> {
        let Some(path) = &self.path else {
            return BTreeMap::new();
        };
        let Ok(contents) = std::fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        toml::from_str(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable prefs file");
            BTreeMap::new()
        })
    }

    /// Persist the full map, logging failures.
    fn write_all(&self, all: &BTreeMap<String, String>) {
        let Some(path) = &self.path else { return };
        let Ok(contents) = toml::to_string(all) else {
            return;
        };
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %path.display(), error = %e, "could not create prefs dir");
            return;
        }
        if let Err(e) = std::fs::write(path, contents) {
            tracing::warn!(path = %path.display(), error = %e, "could not write prefs");
        }
    }
}
