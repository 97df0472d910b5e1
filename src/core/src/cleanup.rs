//! Housekeeping for removed packages: drop their persisted preference
//! entries and de-register them from the privileged policy service, so a
//! reinstall starts from defaults.

use crate::platform::{BooleanPreferenceStore, PrivilegedPolicyService, ProfileId};
use log::info;
use vigil_common::ext::ResultExt;

pub fn purge_removed_package(
    user: ProfileId,
    package: &str,
    stores: &[&dyn BooleanPreferenceStore],
    policy: &dyn PrivilegedPolicyService,
) {
    info!("purging removed package {package} (user {user})");

    for store in stores {
        store
            .remove(package)
            .log_if_error("preference cleanup failed");
    }

    policy
        .remove_package_info(user, package)
        .log_if_error("policy registry cleanup failed");
}
