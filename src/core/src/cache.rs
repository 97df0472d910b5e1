use crate::platform::{AppDescriptor, PackageEnumerationService, PackageQuery, ProfileId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use vigil_common::ext::ResultExt;

/// Per-refresh memo of profile → installed packages: one refresh pass hits
/// the enumeration service at most once per profile, however many profiles
/// carry the same package set. Built fresh for every pass and never retained
/// across refreshes: installed-package state may have changed.
pub struct PmCache {
    pm: Arc<dyn PackageEnumerationService>,
    query: PackageQuery,
    packages: Mutex<HashMap<ProfileId, Arc<[AppDescriptor]>>>,
}

impl PmCache {
    pub fn new(pm: Arc<dyn PackageEnumerationService>, query: PackageQuery) -> Self {
        Self {
            pm,
            query,
            packages: Mutex::new(HashMap::new()),
        }
    }

    /// Enumeration failure degrades to an empty list rather than failing the
    /// whole refresh.
    pub fn packages(&self, profile: ProfileId) -> Arc<[AppDescriptor]> {
        let mut cache = self.packages.lock();

        Arc::clone(cache.entry(profile).or_insert_with(|| {
            self.pm
                .list_installed_packages(profile, self.query)
                .ok_or_warn("package enumeration failed")
                .unwrap_or_default()
                .into()
        }))
    }
}
