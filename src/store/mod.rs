//! Configuration store: snapshots, load/update protocol, change
//! notification.
//!
//! # Data Flow
//! ```text
//! backend.fetch()
//!     → snapshot (Arc<ConfigDocument>, swapped atomically)
//!     → revision bump on the watch channel
//!     → subscribers pull the fresh snapshot when they observe the bump
//! update(key, patch)
//!     → in-flight marker for the section
//!     → backend.persist (all-or-nothing)
//!     → shallow merge into a new snapshot → revision bump
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; readers clone an Arc and never lock
//! - At most one outstanding load; callers that arrive while a load is
//!   in flight share its outcome instead of issuing a duplicate fetch
//! - Updates are strictly serialized per section: a second update for a
//!   section already mid-flight is rejected with [`StoreError::Busy`],
//!   so two patches can never be computed against the same stale
//!   snapshot and merged over each other
//! - Updates for different sections may run concurrently; they touch
//!   disjoint document regions
//! - The merge happens only after the backend confirms the write, so a
//!   failed update leaves the snapshot at last-known-good
//! - After [`ConfigStore::close`], results of still-outstanding
//!   operations are discarded and never mutate the snapshot

use crate::backend::{BackendError, ConfigBackend};
use crate::document::{ConfigDocument, Patch, SectionKey};
use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

/// Failures surfaced by store operations. None of them leave the
/// in-memory document in a partial state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Load or update transport failure, timeouts included.
    #[error("network error: {0}")]
    Network(#[from] BackendError),

    /// An update for this section is already in flight; retry after it
    /// resolves.
    #[error("an update for {0} is already in flight")]
    Busy(SectionKey),

    /// Update or render requested before the first successful load.
    #[error("configuration document is not loaded")]
    NotLoaded,

    /// The store was torn down while the operation was outstanding.
    #[error("store is closed")]
    Closed,
}

/// Explicit state container for the configuration document.
pub struct ConfigStore {
    backend: Arc<dyn ConfigBackend>,
    snapshot: ArcSwapOption<ConfigDocument>,
    /// Serializes loads; also what lets concurrent callers share one fetch.
    load_gate: Mutex<()>,
    /// Sections with an update currently in flight.
    inflight: DashMap<SectionKey, ()>,
    revision: AtomicU64,
    closed: AtomicBool,
    events: watch::Sender<u64>,
}

impl ConfigStore {
    pub fn new<B: ConfigBackend + 'static>(backend: Arc<B>) -> Arc<Self> {
        let (events, _) = watch::channel(0);
        Arc::new(Self {
            backend,
            snapshot: ArcSwapOption::const_empty(),
            load_gate: Mutex::new(()),
            inflight: DashMap::new(),
            revision: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            events,
        })
    }

    /// True once the first load has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.snapshot.load().is_some()
    }

    /// Current immutable snapshot, if initialized.
    pub fn snapshot(&self) -> Option<Arc<ConfigDocument>> {
        self.snapshot.load_full()
    }

    /// Subscribe to change notifications. The channel carries the
    /// revision counter; on a bump, subscribers pull a fresh snapshot.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.events.subscribe()
    }

    /// Fetch the full document and initialize the store.
    ///
    /// Deduplicated: while one load is outstanding, further callers wait
    /// for it and return its result rather than issuing a second fetch.
    /// A failed load leaves the store uninitialized; the next call
    /// retries.
    pub async fn load(&self) -> Result<Arc<ConfigDocument>, StoreError> {
        let _gate = self.load_gate.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        if let Some(doc) = self.snapshot.load_full() {
            return Ok(doc);
        }

        tracing::debug!("loading configuration document");
        let doc = Arc::new(self.backend.fetch().await?);
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        self.snapshot.store(Some(doc.clone()));
        let revision = self.bump();
        tracing::info!(revision, "configuration document loaded");
        Ok(doc)
    }

    /// Persist a patch for one section, then merge it into the snapshot.
    ///
    /// The patch is applied all-or-nothing by the backend; the in-memory
    /// merge only runs after the backend confirms, so any failure leaves
    /// the snapshot at last-known-good.
    pub async fn update(
        &self,
        key: SectionKey,
        patch: Patch,
    ) -> Result<Arc<ConfigDocument>, StoreError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        let Some(current) = self.snapshot.load_full() else {
            return Err(StoreError::NotLoaded);
        };
        if patch.is_empty() {
            return Ok(current);
        }

        let _guard = InflightGuard::acquire(&self.inflight, key.clone())
            .ok_or_else(|| StoreError::Busy(key.clone()))?;

        tracing::debug!(section = %key, fields = patch.len(), "updating section");
        if let Err(e) = self.backend.persist(&key, &patch).await {
            tracing::warn!(section = %key, error = %e, "update rejected, snapshot unchanged");
            return Err(StoreError::Network(e));
        }
        if self.closed.load(Ordering::Acquire) {
            // Session ended mid-flight; the result is discarded.
            return Err(StoreError::Closed);
        }

        let mut merged = None;
        self.snapshot.rcu(|snapshot| {
            let mut doc = snapshot
                .as_deref()
                .cloned()
                .unwrap_or_default();
            doc.merge(&key, &patch);
            let doc = Arc::new(doc);
            merged = Some(doc.clone());
            Some(doc)
        });
        let revision = self.bump();
        tracing::info!(section = %key, revision, "section updated");

        merged.ok_or(StoreError::NotLoaded)
    }

    /// Tear the store down. Outstanding loads and updates resolve with
    /// [`StoreError::Closed`] and never mutate the snapshot.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        tracing::debug!("configuration store closed");
    }

    fn bump(&self) -> u64 {
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.events.send(revision);
        revision
    }
}

/// RAII marker for a section-scoped in-flight update.
struct InflightGuard<'a> {
    map: &'a DashMap<SectionKey, ()>,
    key: SectionKey,
}

impl<'a> InflightGuard<'a> {
    /// Atomically claim the section; `None` if an update is already
    /// in flight for it.
    fn acquire(map: &'a DashMap<SectionKey, ()>, key: SectionKey) -> Option<Self> {
        match map.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(());
                Some(Self { map, key })
            }
        }
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}
