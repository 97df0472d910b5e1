//! The per-operation-kind authorities: each one knows how to read and write
//! the allow-state of a tracked app against its system of record. One
//! generic engine is parametrized by one of these instead of four parallel
//! engine implementations.

use crate::model::{KeyStyle, TrackedApp};
use crate::platform::{
    AppDescriptor, AuthorityError, BooleanPreferenceStore, Mode, OpCode, OpKind,
    OperationModeService, PackageOpState, PackageQuery, PrivilegedPolicyService, ProfileId,
};
use std::collections::HashMap;
use std::sync::Arc;
use vigil_common::ext::ResultExt;

pub trait OperationAuthority: Send + Sync {
    fn kind(&self) -> OpKind;
    fn key_style(&self) -> KeyStyle;
    fn package_query(&self) -> PackageQuery;

    /// One reader per (refresh, profile). Map-backed variants fetch their
    /// per-user info exactly once here.
    fn profile_view(&self, profile: ProfileId) -> Box<dyn StateView>;

    /// Write path: failures always surface so the caller can revert.
    fn set_state(&self, app: &TrackedApp, allow: bool) -> Result<(), AuthorityError>;
}

pub trait StateView {
    /// `None` means the app is not trackable for this kind and is omitted
    /// from the snapshot entirely (not shown as denied).
    fn state_of(&self, desc: &AppDescriptor) -> Option<bool>;
}

/// External service bundle an authority is built from.
#[derive(Clone)]
pub struct Services {
    pub app_ops: Arc<dyn OperationModeService>,
    pub policy: Arc<dyn PrivilegedPolicyService>,
    pub hibernate_prefs: Arc<dyn BooleanPreferenceStore>,
}

pub fn authority_for(kind: OpKind, services: &Services) -> Arc<dyn OperationAuthority> {
    match kind {
        OpKind::WakeLock => Arc::new(AppOpsAuthority {
            kind,
            op: OpCode::WakeLock,
            service: Arc::clone(&services.app_ops),
        }),
        OpKind::Autostart => Arc::new(AppOpsAuthority {
            kind,
            op: OpCode::BootCompleted,
            service: Arc::clone(&services.app_ops),
        }),
        OpKind::Pacifier => Arc::new(PacifierAuthority {
            service: Arc::clone(&services.policy),
        }),
        OpKind::Hibernate => Arc::new(HibernateAuthority {
            prefs: Arc::clone(&services.hibernate_prefs),
        }),
        OpKind::Warden => Arc::new(WardenAuthority {
            service: Arc::clone(&services.policy),
        }),
    }
}

/// Wake-lock / autostart: allow-state lives in the operation-mode service,
/// keyed by (op, uid, package). Only apps declaring the matching manifest
/// permission are trackable.
struct AppOpsAuthority {
    kind: OpKind,
    op: OpCode,
    service: Arc<dyn OperationModeService>,
}

struct AppOpsView {
    op: OpCode,
    service: Arc<dyn OperationModeService>,
}

impl StateView for AppOpsView {
    fn state_of(&self, desc: &AppDescriptor) -> Option<bool> {
        if !desc
            .requested_permissions
            .iter()
            .any(|p| p == self.op.permission())
        {
            return None;
        }

        self.service
            .check_mode(self.op, desc.uid, &desc.package)
            .ok_or_warn("app-op mode check failed")
            .map(|mode| mode == Mode::Allowed)
    }
}

impl OperationAuthority for AppOpsAuthority {
    fn kind(&self) -> OpKind {
        self.kind
    }

    fn key_style(&self) -> KeyStyle {
        KeyStyle::PackageUid
    }

    fn package_query(&self) -> PackageQuery {
        PackageQuery::WithPermissions
    }

    fn profile_view(&self, _profile: ProfileId) -> Box<dyn StateView> {
        Box::new(AppOpsView {
            op: self.op,
            service: Arc::clone(&self.service),
        })
    }

    fn set_state(&self, app: &TrackedApp, allow: bool) -> Result<(), AuthorityError> {
        let mode = if allow { Mode::Allowed } else { Mode::Ignored };
        self.service.set_mode(self.op, app.uid, &app.package, mode)
    }
}

/// Hibernate: a locally persisted boolean per package, default off.
struct HibernateAuthority {
    prefs: Arc<dyn BooleanPreferenceStore>,
}

struct HibernateView {
    prefs: Arc<dyn BooleanPreferenceStore>,
}

impl StateView for HibernateView {
    fn state_of(&self, desc: &AppDescriptor) -> Option<bool> {
        Some(self.prefs.get(&desc.package))
    }
}

impl OperationAuthority for HibernateAuthority {
    fn kind(&self) -> OpKind {
        OpKind::Hibernate
    }

    fn key_style(&self) -> KeyStyle {
        KeyStyle::Package
    }

    fn package_query(&self) -> PackageQuery {
        PackageQuery::Basic
    }

    fn profile_view(&self, _profile: ProfileId) -> Box<dyn StateView> {
        Box::new(HibernateView {
            prefs: Arc::clone(&self.prefs),
        })
    }

    fn set_state(&self, app: &TrackedApp, allow: bool) -> Result<(), AuthorityError> {
        self.prefs.put(&app.package, allow)
    }
}

/// Pacifier: tracked set is whatever the privileged service already knows
/// about. A package missing from the per-user map, or a failed fetch, is
/// silently omitted from that refresh.
struct PacifierAuthority {
    service: Arc<dyn PrivilegedPolicyService>,
}

struct PacifierView {
    info: Option<HashMap<String, PackageOpState>>,
}

impl StateView for PacifierView {
    fn state_of(&self, desc: &AppDescriptor) -> Option<bool> {
        self.info
            .as_ref()?
            .get(&desc.package)
            .map(|state| state.mode == Mode::Allowed)
    }
}

impl OperationAuthority for PacifierAuthority {
    fn kind(&self) -> OpKind {
        OpKind::Pacifier
    }

    fn key_style(&self) -> KeyStyle {
        KeyStyle::Package
    }

    fn package_query(&self) -> PackageQuery {
        PackageQuery::Basic
    }

    fn profile_view(&self, profile: ProfileId) -> Box<dyn StateView> {
        Box::new(PacifierView {
            info: self
                .service
                .get_info(profile)
                .ok_or_warn("pacifier info fetch failed"),
        })
    }

    fn set_state(&self, app: &TrackedApp, allow: bool) -> Result<(), AuthorityError> {
        let mode = if allow { Mode::Allowed } else { Mode::Ignored };
        self.service
            .set_mode_from_uid(app.user, &app.package, app.uid, mode)
    }
}

/// Warden: default-allowed for apps never explicitly configured (fail-open),
/// and a toggle on an unregistered package registers it first; the service
/// requires registration before a mode write.
struct WardenAuthority {
    service: Arc<dyn PrivilegedPolicyService>,
}

struct WardenView {
    info: Option<HashMap<String, PackageOpState>>,
}

impl StateView for WardenView {
    fn state_of(&self, desc: &AppDescriptor) -> Option<bool> {
        let allowed = self
            .info
            .as_ref()
            .and_then(|info| info.get(&desc.package))
            .is_none_or(|state| state.mode == Mode::Allowed);
        Some(allowed)
    }
}

impl OperationAuthority for WardenAuthority {
    fn kind(&self) -> OpKind {
        OpKind::Warden
    }

    fn key_style(&self) -> KeyStyle {
        KeyStyle::Package
    }

    fn package_query(&self) -> PackageQuery {
        PackageQuery::Basic
    }

    fn profile_view(&self, profile: ProfileId) -> Box<dyn StateView> {
        Box::new(WardenView {
            info: self
                .service
                .get_info(profile)
                .ok_or_warn("warden info fetch failed"),
        })
    }

    fn set_state(&self, app: &TrackedApp, allow: bool) -> Result<(), AuthorityError> {
        let mode = if allow { Mode::Allowed } else { Mode::Errored };

        match self
            .service
            .set_mode_from_uid(app.user, &app.package, app.uid, mode)
        {
            Err(AuthorityError::NotRegistered(_)) => {
                self.service
                    .add_package_info(app.user, &app.package, app.uid)?;
                self.service
                    .set_mode_from_uid(app.user, &app.package, app.uid, mode)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{FakePolicyService, descriptor};

    #[test]
    fn pacifier_omits_unlisted_packages() {
        let service = Arc::new(FakePolicyService::default());
        service.register(0, "com.known", 10001, Mode::Ignored);

        let authority = PacifierAuthority {
            service: service as _,
        };
        let view = authority.profile_view(0);

        assert_eq!(view.state_of(&descriptor("com.known", 10001)), Some(false));
        assert_eq!(view.state_of(&descriptor("com.x", 10002)), None);
    }

    #[test]
    fn pacifier_fetch_failure_omits_everything() {
        let service = Arc::new(FakePolicyService::unavailable());
        let authority = PacifierAuthority {
            service: service as _,
        };

        let view = authority.profile_view(0);
        assert_eq!(view.state_of(&descriptor("com.known", 10001)), None);
    }

    #[test]
    fn warden_defaults_to_allowed() {
        let service = Arc::new(FakePolicyService::default());
        service.register(0, "com.denied", 10001, Mode::Errored);

        let authority = WardenAuthority {
            service: service as _,
        };
        let view = authority.profile_view(0);

        assert_eq!(view.state_of(&descriptor("com.denied", 10001)), Some(false));
        // Never configured: fail-open.
        assert_eq!(view.state_of(&descriptor("com.new", 10002)), Some(true));
    }

    #[test]
    fn warden_registers_before_first_write_only() {
        let service = Arc::new(FakePolicyService::default());
        let authority = WardenAuthority {
            service: Arc::clone(&service) as _,
        };

        let desc = descriptor("com.fresh", 10003);
        let app = TrackedApp::new(&desc, 0, true, KeyStyle::Package);

        authority.set_state(&app, false).unwrap();
        assert_eq!(service.add_calls(), 1);

        authority.set_state(&app, true).unwrap();
        assert_eq!(service.add_calls(), 1);
        assert_eq!(service.mode_of(0, "com.fresh"), Some(Mode::Allowed));
    }
}
