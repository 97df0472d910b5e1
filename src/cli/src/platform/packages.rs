//! Package enumeration backed by the system package registry file, with
//! requested-permission resolution via `dumpsys package` when asked for.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::process::Command;
use vigil_common::ext::ResultExt;
use vigil_core::platform::{
    AppDescriptor, AuthorityError, IconHandle, PackageEnumerationService, PackageQuery, ProfileId,
};

const FIRST_APPLICATION_UID: u32 = 10000;
const USER_UID_RANGE: u32 = 100_000;

#[derive(Debug)]
struct PackageRecord {
    name: String,
    app_id: u32,
}

// packages.list: name appId debuggable dataDir seinfo gids
fn parse_line(line: &str) -> Option<PackageRecord> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();

    if fields.len() < 6 {
        return None;
    }

    Some(PackageRecord {
        name: fields[0].into(),
        app_id: fields[1].parse().ok()?,
    })
}

pub struct PackageListService {
    root: PathBuf,
}

impl PackageListService {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/data/system"),
        }
    }

    #[cfg(test)]
    fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn parse_registry(&self) -> Result<Vec<PackageRecord>, AuthorityError> {
        let path = self.root.join("packages.list");
        let file =
            File::open(&path).map_err(|err| AuthorityError::Unavailable(format!("{err:?}")))?;
        let reader = BufReader::new(file);

        Ok(reader
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.is_empty())
            .filter_map(|line| parse_line(&line))
            .collect())
    }

    fn requested_permissions(&self) -> HashMap<String, Vec<String>> {
        let output = Command::new("dumpsys")
            .args(["package", "packages"])
            .output()
            .ok_or_warn("dumpsys package failed");

        match output {
            Some(output) if output.status.success() => {
                parse_dumpsys_packages(&String::from_utf8_lossy(&output.stdout))
            }
            _ => HashMap::new(),
        }
    }
}

impl Default for PackageListService {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageEnumerationService for PackageListService {
    fn list_installed_packages(
        &self,
        profile: ProfileId,
        query: PackageQuery,
    ) -> Result<Vec<AppDescriptor>, AuthorityError> {
        let records = self.parse_registry()?;
        let mut permissions = match query {
            PackageQuery::WithPermissions => self.requested_permissions(),
            PackageQuery::Basic => HashMap::new(),
        };

        Ok(records
            .into_iter()
            .map(|record| AppDescriptor {
                uid: profile * USER_UID_RANGE + record.app_id,
                requested_permissions: permissions.remove(&record.name).unwrap_or_default(),
                is_system: record.app_id < FIRST_APPLICATION_UID,
                label: record.name.clone(),
                icon: IconHandle::new(format!("pkg://{}", record.name)),
                package: record.name,
            })
            .collect())
    }
}

/// Pull `Package [name]` blocks and their `requested permissions:` lists out
/// of `dumpsys package packages` output.
fn parse_dumpsys_packages(text: &str) -> HashMap<String, Vec<String>> {
    let mut result: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;
    let mut in_requested = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("Package [") {
            current = rest.split(']').next().map(str::to_owned);
            in_requested = false;
            continue;
        }

        if trimmed == "requested permissions:" {
            in_requested = current.is_some();
            continue;
        }

        if in_requested {
            // Permission entries are bare identifiers; anything else ends
            // the section.
            if trimmed.contains('.') && !trimmed.contains([' ', ':']) {
                if let Some(pkg) = &current {
                    result.entry(pkg.clone()).or_default().push(trimmed.into());
                }
            } else {
                in_requested = false;
            }
        }
    }

    result
}
