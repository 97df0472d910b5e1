pub mod authority;
pub mod buckets;
pub mod cache;
pub mod cleanup;
pub mod engine;
pub mod model;
pub mod platform;
pub mod prefs;

#[cfg(test)]
pub(crate) mod testkit;

pub use authority::{OperationAuthority, Services, authority_for};
pub use engine::{PolicyEngine, ToggleError};
pub use model::{Presentation, PresentedRow, Snapshot, TrackedApp};
pub use platform::{AppDescriptor, AuthorityError, Mode, OpCode, OpKind, ProfileId};
