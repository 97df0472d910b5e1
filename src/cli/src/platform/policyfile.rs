//! File-persisted stand-in for the privileged per-user package policy
//! registry (warden/pacifier). One TOML document, sectioned by user id.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use vigil_core::platform::{
    AuthorityError, Mode, PackageOpState, PrivilegedPolicyService, ProfileId,
};

// TOML table keys must be strings, so user ids are stored as decimals.
#[derive(Default, Serialize, Deserialize)]
struct PolicyDoc {
    #[serde(default)]
    users: HashMap<String, HashMap<String, PackageOpState>>,
}

pub struct PolicyFile {
    path: PathBuf,
    users: Mutex<HashMap<String, HashMap<String, PackageOpState>>>,
}

fn unavailable(err: impl Debug) -> AuthorityError {
    AuthorityError::Unavailable(format!("{err:?}"))
}

impl PolicyFile {
    pub fn open(dir: &Path) -> Result<Self, AuthorityError> {
        let path = dir.join("policy.toml");

        let users = match fs::read_to_string(&path) {
            Ok(text) => toml::from_str::<PolicyDoc>(&text).map_err(unavailable)?.users,
            Err(err) if err.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(unavailable(err)),
        };

        Ok(Self {
            path,
            users: Mutex::new(users),
        })
    }

    fn persist(
        &self,
        users: &HashMap<String, HashMap<String, PackageOpState>>,
    ) -> Result<(), AuthorityError> {
        let doc = toml::to_string(&PolicyDoc {
            users: users.clone(),
        })
        .map_err(unavailable)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }
        fs::write(&self.path, doc).map_err(unavailable)
    }
}

impl PrivilegedPolicyService for PolicyFile {
    fn get_info(&self, user: ProfileId) -> Result<HashMap<String, PackageOpState>, AuthorityError> {
        Ok(self
            .users
            .lock()
            .get(&user.to_string())
            .cloned()
            .unwrap_or_default())
    }

    fn set_mode_from_uid(
        &self,
        user: ProfileId,
        package: &str,
        uid: u32,
        mode: Mode,
    ) -> Result<(), AuthorityError> {
        let mut users = self.users.lock();

        let state = users
            .entry(user.to_string())
            .or_default()
            .get_mut(package)
            .ok_or_else(|| AuthorityError::NotRegistered(package.to_owned()))?;

        state.uid = uid;
        state.mode = mode;
        self.persist(&users)
    }

    fn add_package_info(
        &self,
        user: ProfileId,
        package: &str,
        uid: u32,
    ) -> Result<(), AuthorityError> {
        let mut users = self.users.lock();

        users.entry(user.to_string()).or_default().insert(
            package.to_owned(),
            PackageOpState {
                uid,
                mode: Mode::Allowed,
            },
        );
        self.persist(&users)
    }

    fn remove_package_info(&self, user: ProfileId, package: &str) -> Result<(), AuthorityError> {
        let mut users = self.users.lock();

        if let Some(packages) = users.get_mut(&user.to_string())
            && packages.remove(package).is_some()
        {
            return self.persist(&users);
        }
        Ok(())
    }
}
