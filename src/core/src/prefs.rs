//! TOML-file-backed boolean preference store, one document per namespace
//! (`hibernate.toml`, `appops_40.toml`, ...).

use crate::platform::{AuthorityError, BooleanPreferenceStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Default, Serialize, Deserialize)]
struct PrefsDoc {
    #[serde(default)]
    entries: HashMap<String, bool>,
}

pub struct TomlPrefs {
    path: PathBuf,
    entries: Mutex<HashMap<String, bool>>,
}

impl TomlPrefs {
    pub fn open(dir: &Path, namespace: &str) -> Result<Self, AuthorityError> {
        let path = dir.join(format!("{namespace}.toml"));

        let entries = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<PrefsDoc>(&text)
                .map_err(unavailable)?
                .entries,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(unavailable(err)),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, bool>) -> Result<(), AuthorityError> {
        let doc = toml::to_string(&PrefsDoc {
            entries: entries.clone(),
        })
        .map_err(unavailable)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }
        fs::write(&self.path, doc).map_err(unavailable)
    }
}

fn unavailable(err: impl Debug) -> AuthorityError {
    AuthorityError::Unavailable(format!("{err:?}"))
}

impl BooleanPreferenceStore for TomlPrefs {
    fn get(&self, key: &str) -> bool {
        self.entries.lock().get(key).copied().unwrap_or(false)
    }

    fn put(&self, key: &str, value: bool) -> Result<(), AuthorityError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_owned(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), AuthorityError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}
