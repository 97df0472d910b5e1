use log::{error, warn};
use std::fmt::Debug;

pub trait ResultExt<T> {
    /// Degrade to `None`, leaving a warning that names the failed step.
    fn ok_or_warn(self, what: &str) -> Option<T>;
    fn log_if_error(self, what: &str);
}

impl<T, E: Debug> ResultExt<T> for Result<T, E> {
    fn ok_or_warn(self, what: &str) -> Option<T> {
        self.inspect_err(|err| warn!("{what}: {err:?}")).ok()
    }

    fn log_if_error(self, what: &str) {
        if let Err(err) = self {
            error!("{what}: {err:?}")
        }
    }
}
