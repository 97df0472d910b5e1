//! Counting fakes for every collaborator trait the engine consumes.

use crate::authority::{Services, authority_for};
use crate::engine::PolicyEngine;
use crate::platform::{
    AppDescriptor, AuthorityError, BooleanPreferenceStore, IconHandle, Mode, OpCode, OpKind,
    OperationModeService, PackageEnumerationService, PackageOpState, PackageQuery,
    PrivilegedPolicyService, ProfileEnumerator, ProfileId, StaticGate,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};

pub fn descriptor(package: &str, uid: u32) -> AppDescriptor {
    labeled(package, uid, package)
}

pub fn labeled(package: &str, uid: u32, label: &str) -> AppDescriptor {
    AppDescriptor {
        package: package.into(),
        uid,
        requested_permissions: Vec::new(),
        is_system: false,
        label: label.into(),
        icon: IconHandle::default(),
    }
}

pub fn with_permission(mut desc: AppDescriptor, permission: &str) -> AppDescriptor {
    desc.requested_permissions.push(permission.into());
    desc
}

pub fn system(mut desc: AppDescriptor) -> AppDescriptor {
    desc.is_system = true;
    desc
}

#[derive(Default)]
pub struct FakePm {
    apps: Vec<AppDescriptor>,
    calls: AtomicUsize,
    fail: bool,
    block: Mutex<Option<Receiver<()>>>,
}

impl FakePm {
    pub fn with_apps(apps: Vec<AppDescriptor>) -> Self {
        Self {
            apps,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Enumeration stalls until the returned sender fires (or drops).
    pub fn gated(apps: Vec<AppDescriptor>) -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = channel();
        let pm = Self {
            apps,
            block: Mutex::new(Some(rx)),
            ..Self::default()
        };
        (Arc::new(pm), tx)
    }

    pub fn enumeration_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PackageEnumerationService for FakePm {
    fn list_installed_packages(
        &self,
        _profile: ProfileId,
        _query: PackageQuery,
    ) -> Result<Vec<AppDescriptor>, AuthorityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(rx) = self.block.lock().take() {
            let _ = rx.recv();
        }

        if self.fail {
            return Err(AuthorityError::Unavailable("package service down".into()));
        }
        Ok(self.apps.clone())
    }
}

pub struct FakeProfiles(pub Vec<ProfileId>);

impl ProfileEnumerator for FakeProfiles {
    fn list_profiles(&self) -> Vec<ProfileId> {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct FakeModeService {
    modes: Mutex<HashMap<(u32, String), Mode>>,
    fail_writes: AtomicBool,
}

impl FakeModeService {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }
}

impl OperationModeService for FakeModeService {
    fn check_mode(&self, _op: OpCode, uid: u32, package: &str) -> Result<Mode, AuthorityError> {
        Ok(self
            .modes
            .lock()
            .get(&(uid, package.to_owned()))
            .copied()
            .unwrap_or(Mode::Allowed))
    }

    fn set_mode(
        &self,
        _op: OpCode,
        uid: u32,
        package: &str,
        mode: Mode,
    ) -> Result<(), AuthorityError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable("app-ops service down".into()));
        }
        self.modes.lock().insert((uid, package.to_owned()), mode);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePolicyService {
    info: Mutex<HashMap<ProfileId, HashMap<String, PackageOpState>>>,
    unavailable: bool,
    add_calls: AtomicUsize,
}

impl FakePolicyService {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn register(&self, user: ProfileId, package: &str, uid: u32, mode: Mode) {
        self.info
            .lock()
            .entry(user)
            .or_default()
            .insert(package.to_owned(), PackageOpState { uid, mode });
    }

    pub fn mode_of(&self, user: ProfileId, package: &str) -> Option<Mode> {
        self.info
            .lock()
            .get(&user)
            .and_then(|m| m.get(package))
            .map(|state| state.mode)
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

impl PrivilegedPolicyService for FakePolicyService {
    fn get_info(&self, user: ProfileId) -> Result<HashMap<String, PackageOpState>, AuthorityError> {
        if self.unavailable {
            return Err(AuthorityError::Unavailable("policy service down".into()));
        }
        Ok(self.info.lock().get(&user).cloned().unwrap_or_default())
    }

    fn set_mode_from_uid(
        &self,
        user: ProfileId,
        package: &str,
        _uid: u32,
        mode: Mode,
    ) -> Result<(), AuthorityError> {
        if self.unavailable {
            return Err(AuthorityError::Unavailable("policy service down".into()));
        }
        let mut info = self.info.lock();
        match info.entry(user).or_default().get_mut(package) {
            Some(state) => {
                state.mode = mode;
                Ok(())
            }
            None => Err(AuthorityError::NotRegistered(package.to_owned())),
        }
    }

    fn add_package_info(
        &self,
        user: ProfileId,
        package: &str,
        uid: u32,
    ) -> Result<(), AuthorityError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        self.register(user, package, uid, Mode::Allowed);
        Ok(())
    }

    fn remove_package_info(&self, user: ProfileId, package: &str) -> Result<(), AuthorityError> {
        if let Some(map) = self.info.lock().get_mut(&user) {
            map.remove(package);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemPrefs {
    map: Mutex<HashMap<String, bool>>,
    fail_writes: AtomicBool,
}

impl MemPrefs {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.map.lock().contains_key(key)
    }
}

impl BooleanPreferenceStore for MemPrefs {
    fn get(&self, key: &str) -> bool {
        self.map.lock().get(key).copied().unwrap_or(false)
    }

    fn put(&self, key: &str, value: bool) -> Result<(), AuthorityError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthorityError::Unavailable("preference store down".into()));
        }
        self.map.lock().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), AuthorityError> {
        self.map.lock().remove(key);
        Ok(())
    }
}

/// One fully-faked device, plus engine constructors over it.
pub struct TestWorld {
    pub pm: Arc<FakePm>,
    pub profiles: Vec<ProfileId>,
    pub app_ops: Arc<FakeModeService>,
    pub policy: Arc<FakePolicyService>,
    pub prefs: Arc<MemPrefs>,
}

impl TestWorld {
    pub fn new(apps: Vec<AppDescriptor>) -> Self {
        Self::with_pm(Arc::new(FakePm::with_apps(apps)))
    }

    pub fn with_pm(pm: Arc<FakePm>) -> Self {
        Self {
            pm,
            profiles: vec![0],
            app_ops: Arc::new(FakeModeService::default()),
            policy: Arc::new(FakePolicyService::default()),
            prefs: Arc::new(MemPrefs::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            app_ops: Arc::clone(&self.app_ops) as _,
            policy: Arc::clone(&self.policy) as _,
            hibernate_prefs: Arc::clone(&self.prefs) as _,
        }
    }

    pub fn engine(&self, kind: OpKind) -> Arc<PolicyEngine> {
        self.engine_gated(kind, true)
    }

    pub fn engine_gated(&self, kind: OpKind, enabled: bool) -> Arc<PolicyEngine> {
        PolicyEngine::new(
            authority_for(kind, &self.services()),
            Arc::new(FakeProfiles(self.profiles.clone())),
            Arc::clone(&self.pm) as _,
            Arc::new(StaticGate(enabled)),
        )
    }
}
