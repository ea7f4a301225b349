//! Two-slot sync engine.
//!
//! [`SyncEngine`] owns two snapshot slots and an active selector. Readers
//! call [`SyncEngine::active`] and get whichever complete snapshot is active
//! at that instant. A refresh rebuilds only the inactive slot and, once the
//! new snapshot is fully built, flips the selector in one atomic store.
//!
//! # Thread Safety
//!
//! - `active()` is a lock-free selector load plus an uncontended read lock
//!   on a slot that no sync writes while it is active
//! - at most one sync runs at a time (async mutex held across the sync)
//! - blocking source calls run on the blocking pool

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use thoughts_source::ContentSource;
use tracing::{debug, info};

use crate::error::SyncError;
use crate::snapshot::{ExtractOptions, Snapshot};

/// One of the two snapshot slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    /// First slot, active on startup.
    A,
    /// Second slot.
    B,
}

impl SlotId {
    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    fn from_index(index: usize) -> Self {
        if index == 0 { Self::A } else { Self::B }
    }

    /// The other slot.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::A => "A",
            Self::B => "B",
        })
    }
}

/// Lifecycle state of a slot: `Empty -> Building -> Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// Never built.
    Empty,
    /// A sync is pulling into this slot.
    Building,
    /// Holds a complete snapshot.
    Ready,
}

/// Result of a successful sync of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The fingerprint matched the slot's snapshot; nothing was pulled.
    Unchanged {
        /// Fingerprint reported by the source.
        fingerprint: String,
    },
    /// A new snapshot was built and installed in the slot.
    Updated {
        /// Fingerprint of the new snapshot.
        fingerprint: String,
        /// Routed documents in the new snapshot, not counting the index.
        documents: usize,
    },
}

impl SyncOutcome {
    /// Fingerprint the slot now holds.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        match self {
            Self::Unchanged { fingerprint } | Self::Updated { fingerprint, .. } => fingerprint,
        }
    }
}

/// Result of a successful [`SyncEngine::refresh`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshOutcome {
    /// Slot that was synced and is now active.
    pub slot: SlotId,
    /// What the sync did.
    pub outcome: SyncOutcome,
}

struct SlotInner {
    status: SlotStatus,
    snapshot: Option<Arc<Snapshot>>,
}

/// Keeps the served snapshot current.
pub struct SyncEngine {
    source: Arc<dyn ContentSource>,
    options: ExtractOptions,
    slots: [RwLock<SlotInner>; 2],
    /// Index of the active slot.
    active: AtomicUsize,
    /// Held for the whole duration of a sync.
    sync_lock: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    /// Create an engine with both slots empty and slot A active.
    pub fn new(source: Arc<dyn ContentSource>, options: ExtractOptions) -> Self {
        let empty = || {
            RwLock::new(SlotInner {
                status: SlotStatus::Empty,
                snapshot: None,
            })
        };
        Self {
            source,
            options,
            slots: [empty(), empty()],
            active: AtomicUsize::new(SlotId::A.index()),
            sync_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Currently active slot.
    #[must_use]
    pub fn active_slot(&self) -> SlotId {
        SlotId::from_index(self.active.load(Ordering::Acquire))
    }

    /// Snapshot of the active slot, `None` until the first successful sync.
    #[must_use]
    pub fn active(&self) -> Option<Arc<Snapshot>> {
        self.active_with_slot().1
    }

    /// Active slot together with its snapshot, from a single selector load.
    #[must_use]
    pub fn active_with_slot(&self) -> (SlotId, Option<Arc<Snapshot>>) {
        let slot = self.active_slot();
        (slot, self.snapshot(slot))
    }

    /// Snapshot currently held by `slot`.
    #[must_use]
    pub fn snapshot(&self, slot: SlotId) -> Option<Arc<Snapshot>> {
        self.slots[slot.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot
            .clone()
    }

    /// Lifecycle state of `slot`.
    #[must_use]
    pub fn slot_status(&self, slot: SlotId) -> SlotStatus {
        self.slots[slot.index()]
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .status
    }

    /// Sync the active slot. Used once before serving.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the source fails or the pulled tree has no
    /// index document.
    pub async fn sync_active(&self) -> Result<SyncOutcome, SyncError> {
        let _guard = self.sync_lock.lock().await;
        self.sync_locked(self.active_slot()).await
    }

    /// Sync one slot, active or not.
    ///
    /// Skips the pull when the source fingerprint equals the one the slot
    /// was built from. Otherwise pulls, extracts and installs the new
    /// snapshot. On error the slot keeps its previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the source fails or the pulled tree has no
    /// index document.
    #[cfg(test)]
    pub(crate) async fn sync_slot(&self, slot: SlotId) -> Result<SyncOutcome, SyncError> {
        let _guard = self.sync_lock.lock().await;
        self.sync_locked(slot).await
    }

    /// Sync the inactive slot and, on success, make it active.
    ///
    /// On error the selector is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] if the inactive slot could not be synced.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SyncError> {
        let _guard = self.sync_lock.lock().await;
        let slot = self.active_slot().other();

        let outcome = self.sync_locked(slot).await?;
        self.active.store(slot.index(), Ordering::Release);
        info!(slot = %slot, fingerprint = outcome.fingerprint(), "Switched active slot");

        Ok(RefreshOutcome { slot, outcome })
    }

    /// Sync `slot`. Caller holds `sync_lock`.
    async fn sync_locked(&self, slot: SlotId) -> Result<SyncOutcome, SyncError> {
        let previous = self.snapshot(slot);

        let source = Arc::clone(&self.source);
        let fingerprint = tokio::task::spawn_blocking(move || source.last_hash()).await??;

        if previous
            .as_ref()
            .is_some_and(|snapshot| snapshot.fingerprint() == fingerprint)
        {
            debug!(slot = %slot, fingerprint = %fingerprint, "Fingerprint unchanged, skipping pull");
            return Ok(SyncOutcome::Unchanged { fingerprint });
        }

        // The active slot keeps reporting Ready while it is rebuilt in place.
        let previous_status = self.slot_status(slot);
        let mark_building = slot != self.active_slot() || previous_status != SlotStatus::Ready;
        if mark_building {
            self.set_status(slot, SlotStatus::Building);
        }

        debug!(slot = %slot, fingerprint = %fingerprint, "Pulling contents");
        let source = Arc::clone(&self.source);
        let options = self.options.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<Snapshot, SyncError> {
            // The tree is dropped, releasing the pull, on every path out.
            let tree = source.contents()?;
            Snapshot::extract(fingerprint, tree.as_ref(), &options)
        })
        .await
        .map_err(SyncError::from)
        .and_then(|result| result);

        match result {
            Ok(snapshot) => {
                let outcome = SyncOutcome::Updated {
                    fingerprint: snapshot.fingerprint().to_owned(),
                    documents: snapshot.len(),
                };
                let mut inner = self.slots[slot.index()]
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                inner.snapshot = Some(Arc::new(snapshot));
                inner.status = SlotStatus::Ready;
                drop(inner);

                info!(slot = %slot, fingerprint = outcome.fingerprint(), "Built snapshot");
                Ok(outcome)
            }
            Err(e) => {
                if mark_building {
                    self.set_status(slot, previous_status);
                }
                Err(e)
            }
        }
    }

    fn set_status(&self, slot: SlotId, status: SlotStatus) {
        self.slots[slot.index()]
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .status = status;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use thoughts_source::{MemoryTree, MockSource};

    use super::*;
    use crate::error::SyncErrorKind;

    static_assertions::assert_impl_all!(super::SyncEngine: Send, Sync);

    fn notes_source(hash: &str) -> Arc<MockSource> {
        Arc::new(
            MockSource::new(hash)
                .with_file("owner-notes-abc/README.md", "Hello")
                .with_file("owner-notes-abc/notes/today.md", "See [link](./other.md)"),
        )
    }

    fn engine(source: &Arc<MockSource>) -> SyncEngine {
        SyncEngine::new(
            Arc::clone(source) as Arc<dyn ContentSource>,
            ExtractOptions::default(),
        )
    }

    #[tokio::test]
    async fn test_nothing_active_before_first_sync() {
        let source = notes_source("abc");
        let engine = engine(&source);

        assert!(engine.active().is_none());
        assert_eq!(engine.active_slot(), SlotId::A);
        assert_eq!(engine.slot_status(SlotId::A), SlotStatus::Empty);
        assert_eq!(engine.slot_status(SlotId::B), SlotStatus::Empty);
    }

    #[tokio::test]
    async fn test_sync_active_exposes_documents() {
        let source = notes_source("abc");
        let engine = engine(&source);

        let outcome = engine.sync_active().await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Updated {
                fingerprint: "abc".to_owned(),
                documents: 1
            }
        );
        let snapshot = engine.active().unwrap();
        assert!(snapshot.index().html().unwrap().contains("Hello"));
        let today = snapshot.get("notes/today").unwrap().html().unwrap();
        assert!(today.contains(r#"href="./other""#));
        assert!(!today.contains("./other.md"));
        assert_eq!(engine.slot_status(SlotId::A), SlotStatus::Ready);
        assert_eq!(source.released(), 1);
    }

    #[tokio::test]
    async fn test_same_fingerprint_skips_pull() {
        let source = notes_source("abc");
        let engine = engine(&source);

        engine.sync_slot(SlotId::A).await.unwrap();
        let outcome = engine.sync_slot(SlotId::A).await.unwrap();

        assert_eq!(
            outcome,
            SyncOutcome::Unchanged {
                fingerprint: "abc".to_owned()
            }
        );
        assert_eq!(source.hash_calls(), 2);
        assert_eq!(source.contents_calls(), 1);
    }

    #[tokio::test]
    async fn test_changed_fingerprint_pulls_again() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_slot(SlotId::A).await.unwrap();

        source.set_hash("def");
        source.set_tree(MemoryTree::new().with_file("w/README.md", "Updated"));
        engine.sync_slot(SlotId::A).await.unwrap();

        let snapshot = engine.active().unwrap();
        assert_eq!(snapshot.fingerprint(), "def");
        assert_eq!(snapshot.index().raw(), b"Updated");
        assert_eq!(source.contents_calls(), 2);
    }

    #[tokio::test]
    async fn test_refresh_alternates_slots() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_active().await.unwrap();

        let first = engine.refresh().await.unwrap();
        assert_eq!(first.slot, SlotId::B);
        assert_eq!(engine.active_slot(), SlotId::B);

        source.set_hash("def");
        let second = engine.refresh().await.unwrap();
        assert_eq!(second.slot, SlotId::A);
        assert_eq!(engine.active_slot(), SlotId::A);
        assert_eq!(engine.active().unwrap().fingerprint(), "def");
        assert_eq!(engine.snapshot(SlotId::B).unwrap().fingerprint(), "abc");
    }

    #[tokio::test]
    async fn test_active_with_slot_pairs_slot_and_snapshot() {
        let source = notes_source("abc");
        let engine = engine(&source);
        assert_eq!(engine.active_with_slot().0, SlotId::A);
        assert!(engine.active_with_slot().1.is_none());

        engine.sync_active().await.unwrap();
        source.set_hash("def");
        engine.refresh().await.unwrap();

        let (slot, snapshot) = engine.active_with_slot();
        assert_eq!(slot, SlotId::B);
        assert_eq!(snapshot.unwrap().fingerprint(), "def");
    }

    #[tokio::test]
    async fn test_refresh_unchanged_slot_does_not_pull() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_active().await.unwrap();
        engine.refresh().await.unwrap();
        assert_eq!(source.contents_calls(), 2);

        // Both slots now hold "abc": further refreshes only check fingerprints.
        let outcome = engine.refresh().await.unwrap();
        engine.refresh().await.unwrap();

        assert!(matches!(outcome.outcome, SyncOutcome::Unchanged { .. }));
        assert_eq!(source.contents_calls(), 2);
        assert_eq!(source.hash_calls(), 4);
    }

    #[tokio::test]
    async fn test_failed_pull_keeps_selector() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_active().await.unwrap();

        source.set_hash("def");
        source.fail_contents(true);
        let err = engine.refresh().await.unwrap_err();

        assert_eq!(err.kind(), SyncErrorKind::Unreachable);
        assert_eq!(engine.active_slot(), SlotId::A);
        assert_eq!(engine.slot_status(SlotId::B), SlotStatus::Empty);
        let snapshot = engine.active().unwrap();
        assert_eq!(snapshot.fingerprint(), "abc");
        assert!(snapshot.get("notes/today").unwrap().html().is_ok());
    }

    #[tokio::test]
    async fn test_failed_fingerprint_keeps_selector() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_active().await.unwrap();

        source.fail_hash(true);

        assert!(engine.refresh().await.is_err());
        assert_eq!(engine.active_slot(), SlotId::A);
        assert_eq!(source.contents_calls(), 1);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_snapshot() {
        let source = notes_source("abc");
        let engine = engine(&source);
        engine.sync_active().await.unwrap();
        engine.refresh().await.unwrap();
        source.set_hash("def");
        engine.refresh().await.unwrap();
        assert_eq!(engine.active_slot(), SlotId::A);

        // Slot B still holds "abc"; a broken pull must not disturb it.
        source.set_hash("ghi");
        source.set_tree(MemoryTree::new().with_file("w/notes.md", "no index"));
        let err = engine.refresh().await.unwrap_err();

        assert_eq!(err.kind(), SyncErrorKind::MissingIndex);
        assert_eq!(engine.active_slot(), SlotId::A);
        assert_eq!(engine.slot_status(SlotId::B), SlotStatus::Ready);
        assert_eq!(engine.snapshot(SlotId::B).unwrap().fingerprint(), "abc");
    }

    #[tokio::test]
    async fn test_pull_released_on_every_path() {
        let source = Arc::new(MockSource::new("abc").with_file("w/notes.md", "no index"));
        let engine = engine(&source);

        assert!(matches!(
            engine.sync_active().await,
            Err(SyncError::MissingIndex { .. })
        ));
        assert_eq!(source.contents_calls(), 1);
        assert_eq!(source.released(), 1);
        assert!(engine.active().is_none());
        assert_eq!(engine.slot_status(SlotId::A), SlotStatus::Empty);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_always_see_complete_snapshots() {
        let source = notes_source("0");
        let engine = Arc::new(engine(&source));
        engine.sync_active().await.unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move {
                    for _ in 0..200 {
                        let snapshot = engine.active().unwrap();
                        assert_eq!(snapshot.index().raw(), b"Hello");
                        assert!(snapshot.get("notes/today").is_some());
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for i in 1..=20 {
            source.set_hash(i.to_string());
            engine.refresh().await.unwrap();
        }

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(engine.active().unwrap().fingerprint(), "20");
    }

    #[test]
    fn test_slot_id() {
        assert_eq!(SlotId::A.other(), SlotId::B);
        assert_eq!(SlotId::B.other(), SlotId::A);
        assert_eq!(SlotId::from_index(SlotId::B.index()), SlotId::B);
        assert_eq!(SlotId::B.to_string(), "B");
    }
}
