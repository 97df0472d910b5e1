//! Device-facing implementations of the engine's collaborator traits.

mod appops;
mod packages;
mod policyfile;
mod users;

pub use appops::AppOpsShell;
pub use packages::PackageListService;
pub use policyfile::PolicyFile;
pub use users::UserDirectoryEnumerator;

use crate::config::VigilConfigs;
use anyhow::Result;
use log::debug;
use std::sync::Arc;
use vigil_core::Services;
use vigil_core::platform::{FeatureGate, OpKind};
use vigil_core::prefs::TomlPrefs;

/// The capability flag: a marker file dropped by the provisioning step, or
/// the `--assume-verified` override.
pub struct VerifiedGate;

impl FeatureGate for VerifiedGate {
    fn is_enabled(&self) -> bool {
        let configs = VigilConfigs::instance();
        configs.assume_verified || configs.data_dir.join("verified").exists()
    }
}

pub fn services() -> Result<Services> {
    let configs = VigilConfigs::instance();
    debug!("policy state directory: {}", configs.data_dir.display());

    Ok(Services {
        app_ops: Arc::new(AppOpsShell),
        policy: Arc::new(PolicyFile::open(&configs.data_dir)?),
        hibernate_prefs: Arc::new(TomlPrefs::open(
            &configs.data_dir,
            OpKind::Hibernate.pref_namespace(),
        )?),
    })
}
