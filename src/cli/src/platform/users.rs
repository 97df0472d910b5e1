use std::fs;
use std::path::PathBuf;
use vigil_common::ext::ResultExt;
use vigil_core::platform::{ProfileEnumerator, ProfileId};

/// User profiles from the system user registry: one `<id>.xml` per profile.
/// Falls back to the owner profile when the registry cannot be read.
pub struct UserDirectoryEnumerator {
    root: PathBuf,
}

impl UserDirectoryEnumerator {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/data/system/users"),
        }
    }

    #[cfg(test)]
    fn with_root(root: PathBuf) -> Self {
        Self { root }
    }
}

impl Default for UserDirectoryEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileEnumerator for UserDirectoryEnumerator {
    fn list_profiles(&self) -> Vec<ProfileId> {
        let Some(entries) = fs::read_dir(&self.root).ok_or_warn("user registry unreadable") else {
            return vec![0];
        };

        let mut profiles: Vec<ProfileId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                entry
                    .file_name()
                    .to_str()?
                    .strip_suffix(".xml")?
                    .parse()
                    .ok()
            })
            .collect();

        profiles.sort_unstable();

        if profiles.is_empty() {
            profiles.push(0);
        }
        profiles
    }
}
