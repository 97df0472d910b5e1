//! The generic policy engine: one instance per operation kind, parametrized
//! by its authority. Refreshes run on the blocking pool, at most one in
//! flight per instance; toggles are synchronous write-throughs against the
//! authority followed by an incremental bucket update.

use crate::authority::OperationAuthority;
use crate::buckets::{Bucket, Partition};
use crate::cache::PmCache;
use crate::model::{Presentation, PresentedRow, Snapshot, TrackedApp};
use crate::platform::{AuthorityError, FeatureGate, PackageEnumerationService, ProfileEnumerator};
use log::{debug, info};
use parking_lot::RwLock;
use scopeguard::defer;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{self, JoinHandle};

#[derive(Debug, Error)]
pub enum ToggleError {
    /// The key is not in the current snapshot. A toggle from the displayed
    /// list should never hit this; it indicates a refresh raced the caller.
    #[error("unknown key: {0}")]
    UnknownKey(String),
    #[error(transparent)]
    Authority(#[from] AuthorityError),
}

/// Snapshot and partition are replaced together; readers never observe a
/// sequence and an index (or a partition) from different refreshes.
#[derive(Default)]
struct Published {
    snapshot: Snapshot,
    partition: Partition,
}

pub struct PolicyEngine {
    authority: Arc<dyn OperationAuthority>,
    profiles: Arc<dyn ProfileEnumerator>,
    packages: Arc<dyn PackageEnumerationService>,
    gate: Arc<dyn FeatureGate>,
    published: RwLock<Published>,
    refreshing: AtomicBool,
    notify: watch::Sender<Presentation>,
}

impl PolicyEngine {
    pub fn new(
        authority: Arc<dyn OperationAuthority>,
        profiles: Arc<dyn ProfileEnumerator>,
        packages: Arc<dyn PackageEnumerationService>,
        gate: Arc<dyn FeatureGate>,
    ) -> Arc<Self> {
        let (notify, _) = watch::channel(Presentation::default());

        Arc::new(Self {
            authority,
            profiles,
            packages,
            gate,
            published: RwLock::new(Published::default()),
            refreshing: AtomicBool::new(false),
            notify,
        })
    }

    /// Kick off a refresh pass. Returns `None` while one is already in
    /// flight; concurrent callers share that pass's result instead of
    /// queueing another enumeration.
    pub fn refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.refreshing.swap(true, Ordering::AcqRel) {
            debug!("{}: refresh already in flight", self.authority.kind());
            return None;
        }

        let engine = Arc::clone(self);

        Some(task::spawn_blocking(move || {
            defer! {
                engine.refreshing.store(false, Ordering::Release);
            }

            let snapshot = engine.load_snapshot();
            info!(
                "{}: refreshed, {} tracked apps",
                engine.authority.kind(),
                snapshot.len()
            );

            let partition = Partition::from_snapshot(&snapshot);
            let presentation = presentation_of(&snapshot, &partition);

            *engine.published.write() = Published {
                snapshot,
                partition,
            };

            let _ = engine.notify.send(presentation);
        }))
    }

    fn load_snapshot(&self) -> Snapshot {
        if !self.gate.is_enabled() {
            debug!(
                "{}: feature gate disabled, presenting empty app set",
                self.authority.kind()
            );
            return Snapshot::default();
        }

        // Fresh cache per pass; package state may change between refreshes.
        let cache = PmCache::new(Arc::clone(&self.packages), self.authority.package_query());
        let style = self.authority.key_style();
        let mut apps = Vec::new();

        for profile in self.profiles.list_profiles() {
            let view = self.authority.profile_view(profile);

            for desc in cache.packages(profile).iter() {
                if !desc.passes_system_filter() {
                    continue;
                }
                if let Some(allowed) = view.state_of(desc) {
                    apps.push(TrackedApp::new(desc, profile, allowed, style));
                }
            }
        }

        Snapshot::build(apps)
    }

    /// Write the new allow-state through the authority, then reconcile the
    /// presented partition. The authority stays the source of truth: a
    /// failed write leaves local state untouched, and the next refresh
    /// re-derives whatever the authority now holds.
    pub fn toggle(&self, key: &str, allow: bool) -> Result<(), ToggleError> {
        let mut published = self.published.write();

        let app = published
            .snapshot
            .get(key)
            .ok_or_else(|| ToggleError::UnknownKey(key.to_owned()))?
            .clone();

        if app.allowed == allow {
            return Ok(());
        }

        self.authority.set_state(&app, allow)?;

        published.snapshot.set_allowed(key, allow);
        let Published {
            snapshot,
            partition,
        } = &mut *published;
        partition.apply_toggle(snapshot, key, allow);

        Ok(())
    }

    /// Receiver for refresh completions, to be awaited on the UI-facing
    /// context. Carries the full presentation of the new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Presentation> {
        self.notify.subscribe()
    }

    pub fn presentation(&self) -> Presentation {
        let published = self.published.read();
        presentation_of(&published.snapshot, &published.partition)
    }
}

fn presentation_of(snapshot: &Snapshot, partition: &Partition) -> Presentation {
    let rows = partition
        .sections()
        .iter()
        .flat_map(|section| section.keys.iter())
        .filter_map(|key| snapshot.get(key).map(PresentedRow::from))
        .collect();

    Presentation {
        rows,
        allow_count: partition.count(Bucket::Allow),
        deny_count: partition.count(Bucket::Deny),
    }
}
