//! Collaborator interfaces of the policy engine. Everything the engine
//! knows about the device comes through these traits; concrete backends
//! live in the `vigil` binary and in test fakes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

pub type ProfileId = u32;

/// System apps never show up in a snapshot, with one deliberate carve-out.
pub const SYSTEM_EXEMPT: &[&str] = &["com.android.mms"];

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error("authority unavailable: {0}")]
    Unavailable(String),
    #[error("package not registered: {0}")]
    NotRegistered(String),
}

/// Operation mode as reported by the privileged services.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Allowed,
    Ignored,
    Errored,
}

/// App-op codes tracked through the operation-mode service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpCode {
    WakeLock = 40,
    BootCompleted = 65,
}

impl OpCode {
    /// Manifest permission an app must declare to be tracked for this op.
    pub fn permission(self) -> &'static str {
        match self {
            OpCode::WakeLock => "android.permission.WAKE_LOCK",
            OpCode::BootCompleted => "android.permission.RECEIVE_BOOT_COMPLETED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum OpKind {
    WakeLock,
    Autostart,
    Pacifier,
    Hibernate,
    Warden,
}

impl OpKind {
    /// Namespace of the persisted preference file for this kind. The app-op
    /// kinds keep the historical `appops_<code>` naming.
    pub fn pref_namespace(self) -> &'static str {
        match self {
            OpKind::WakeLock => "appops_40",
            OpKind::Autostart => "appops_65",
            OpKind::Pacifier => "pacifier",
            OpKind::Hibernate => "hibernate",
            OpKind::Warden => "warden",
        }
    }
}

/// Opaque reference to an app icon resource. The engine only carries it
/// through to the presentation layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IconHandle(Arc<str>);

impl IconHandle {
    pub fn new(resource: impl Into<Arc<str>>) -> Self {
        Self(resource.into())
    }

    pub fn resource(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct AppDescriptor {
    pub package: String,
    pub uid: u32,
    pub requested_permissions: Vec<String>,
    pub is_system: bool,
    pub label: String,
    pub icon: IconHandle,
}

impl AppDescriptor {
    /// System apps are excluded unless explicitly exempted.
    pub fn passes_system_filter(&self) -> bool {
        !self.is_system || SYSTEM_EXEMPT.contains(&self.package.as_str())
    }
}

/// Whether package enumeration should resolve requested permissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackageQuery {
    Basic,
    WithPermissions,
}

pub trait ProfileEnumerator: Send + Sync {
    fn list_profiles(&self) -> Vec<ProfileId>;
}

pub trait PackageEnumerationService: Send + Sync {
    fn list_installed_packages(
        &self,
        profile: ProfileId,
        query: PackageQuery,
    ) -> Result<Vec<AppDescriptor>, AuthorityError>;
}

pub trait OperationModeService: Send + Sync {
    fn check_mode(&self, op: OpCode, uid: u32, package: &str) -> Result<Mode, AuthorityError>;
    fn set_mode(
        &self,
        op: OpCode,
        uid: u32,
        package: &str,
        mode: Mode,
    ) -> Result<(), AuthorityError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageOpState {
    pub uid: u32,
    pub mode: Mode,
}

/// Privileged per-user package policy registry (warden and pacifier).
pub trait PrivilegedPolicyService: Send + Sync {
    fn get_info(&self, user: ProfileId) -> Result<HashMap<String, PackageOpState>, AuthorityError>;

    /// Fails with [`AuthorityError::NotRegistered`] when the package has no
    /// entry for this user yet.
    fn set_mode_from_uid(
        &self,
        user: ProfileId,
        package: &str,
        uid: u32,
        mode: Mode,
    ) -> Result<(), AuthorityError>;

    fn add_package_info(
        &self,
        user: ProfileId,
        package: &str,
        uid: u32,
    ) -> Result<(), AuthorityError>;

    fn remove_package_info(&self, user: ProfileId, package: &str) -> Result<(), AuthorityError>;
}

pub trait BooleanPreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> bool;
    fn put(&self, key: &str, value: bool) -> Result<(), AuthorityError>;
    fn remove(&self, key: &str) -> Result<(), AuthorityError>;
}

/// The externally-checked capability flag. When disabled, refreshes still
/// publish, but with an empty app set.
pub trait FeatureGate: Send + Sync {
    fn is_enabled(&self) -> bool;
}

pub struct StaticGate(pub bool);

impl FeatureGate for StaticGate {
    fn is_enabled(&self) -> bool {
        self.0
    }
}
