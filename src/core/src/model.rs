use crate::platform::{AppDescriptor, IconHandle, ProfileId};
use std::collections::HashMap;

/// Key derivation for tracked apps. App-op kinds key by package and uid
/// (concatenated with no separator, the historical format), the privileged and
/// preference-backed kinds key by package alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyStyle {
    Package,
    PackageUid,
}

impl KeyStyle {
    pub fn key_of(self, package: &str, uid: u32) -> String {
        match self {
            KeyStyle::Package => package.to_owned(),
            KeyStyle::PackageUid => format!("{package}{uid}"),
        }
    }
}

/// One application tracked for a single operation kind. Instances are built
/// fresh on every refresh; only the presented `allowed` flag is ever mutated
/// in place (by a successful toggle).
#[derive(Clone, Debug)]
pub struct TrackedApp {
    pub package: String,
    pub user: ProfileId,
    pub uid: u32,
    pub label: String,
    pub icon: IconHandle,
    pub allowed: bool,
    key: String,
}

impl TrackedApp {
    pub fn new(desc: &AppDescriptor, user: ProfileId, allowed: bool, style: KeyStyle) -> Self {
        Self {
            key: style.key_of(&desc.package, desc.uid),
            package: desc.package.clone(),
            user,
            uid: desc.uid,
            label: desc.label.clone(),
            icon: desc.icon.clone(),
            allowed,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

/// The published result of one refresh pass: apps sorted ascending by label
/// (ties broken by key, byte-wise) with a key index rebuilt alongside.
#[derive(Debug, Default)]
pub struct Snapshot {
    apps: Vec<TrackedApp>,
    index: HashMap<String, usize>,
}

impl Snapshot {
    pub fn build(mut apps: Vec<TrackedApp>) -> Self {
        apps.sort_by(|a, b| {
            a.label
                .cmp(&b.label)
                .then_with(|| a.key().cmp(b.key()))
        });

        let mut index = HashMap::with_capacity(apps.len());
        let mut unique = Vec::with_capacity(apps.len());

        for app in apps {
            if index.contains_key(app.key()) {
                continue;
            }
            index.insert(app.key().to_owned(), unique.len());
            unique.push(app);
        }

        Self { apps: unique, index }
    }

    pub fn get(&self, key: &str) -> Option<&TrackedApp> {
        self.index.get(key).map(|&i| &self.apps[i])
    }

    /// Position of a key in the sorted sequence.
    pub(crate) fn rank(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn set_allowed(&mut self, key: &str, allowed: bool) {
        if let Some(&i) = self.index.get(key) {
            self.apps[i].allowed = allowed;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedApp> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

/// One row handed to the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentedRow {
    pub key: String,
    pub package: String,
    pub label: String,
    pub icon: IconHandle,
    pub allowed: bool,
}

impl From<&TrackedApp> for PresentedRow {
    fn from(app: &TrackedApp) -> Self {
        Self {
            key: app.key().to_owned(),
            package: app.package.clone(),
            label: app.label.clone(),
            icon: app.icon.clone(),
            allowed: app.allowed,
        }
    }
}

/// Rows in bucket presentation order, plus the bucket boundaries the UI
/// needs for header visibility.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Presentation {
    pub rows: Vec<PresentedRow>,
    pub allow_count: usize,
    pub deny_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::IconHandle;

    fn desc(package: &str, uid: u32, label: &str) -> AppDescriptor {
        AppDescriptor {
            package: package.into(),
            uid,
            requested_permissions: Vec::new(),
            is_system: false,
            label: label.into(),
            icon: IconHandle::default(),
        }
    }

    #[test]
    fn sorts_by_label_then_key() {
        let apps = vec![
            TrackedApp::new(&desc("com.c", 3, "Maps"), 0, true, KeyStyle::PackageUid),
            TrackedApp::new(&desc("com.a", 1, "Maps"), 0, true, KeyStyle::PackageUid),
            TrackedApp::new(&desc("com.b", 2, "Browser"), 0, false, KeyStyle::PackageUid),
        ];

        let snapshot = Snapshot::build(apps);
        let keys: Vec<_> = snapshot.iter().map(TrackedApp::key).collect();

        // "Browser" first, then the two "Maps" entries tie-broken by key.
        assert_eq!(keys, vec!["com.b2", "com.a1", "com.c3"]);
    }

    #[test]
    fn label_compare_is_case_sensitive() {
        let apps = vec![
            TrackedApp::new(&desc("com.a", 1, "alpha"), 0, true, KeyStyle::Package),
            TrackedApp::new(&desc("com.b", 2, "Beta"), 0, true, KeyStyle::Package),
        ];

        let snapshot = Snapshot::build(apps);
        let labels: Vec<_> = snapshot.iter().map(|a| a.label.as_str()).collect();

        // Uppercase sorts before lowercase under byte-wise comparison.
        assert_eq!(labels, vec!["Beta", "alpha"]);
    }

    #[test]
    fn duplicate_keys_keep_first_occurrence() {
        let apps = vec![
            TrackedApp::new(&desc("com.dup", 5, "Dup"), 0, true, KeyStyle::Package),
            TrackedApp::new(&desc("com.dup", 5, "Dup"), 10, false, KeyStyle::Package),
        ];

        let snapshot = Snapshot::build(apps);

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("com.dup").unwrap().allowed);
    }

    #[test]
    fn package_uid_key_concatenates() {
        assert_eq!(KeyStyle::PackageUid.key_of("com.x", 10010), "com.x10010");
        assert_eq!(KeyStyle::Package.key_of("com.x", 10010), "com.x");
    }
}
