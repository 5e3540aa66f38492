use arc_swap::ArcSwapOption;
use std::sync::Arc;

use super::types::{Snapshot, UNVERSIONED};

/// Outcome of offering a fetched snapshot to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// The store was empty, held an older snapshot, or held a pending one
    /// at the same version.
    Replaced,
    /// The stored snapshot is at least as new and not pending.
    Kept,
}

/// Latest snapshot known to this agent.
///
/// Readers never block writers: the snapshot is swapped wholesale, and a
/// lower version never displaces a higher one that is already ready.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn version(&self) -> i64 {
        self.current
            .load()
            .as_ref()
            .map_or(UNVERSIONED, |s| s.version)
    }

    pub fn offer(&self, fetched: Arc<Snapshot>) -> StoreOutcome {
        let mut outcome = StoreOutcome::Kept;
        self.current.rcu(|stored| {
            if should_replace(stored.as_deref(), &fetched) {
                outcome = StoreOutcome::Replaced;
                Some(Arc::clone(&fetched))
            } else {
                outcome = StoreOutcome::Kept;
                stored.clone()
            }
        });
        outcome
    }
}

fn should_replace(stored: Option<&Snapshot>, fetched: &Snapshot) -> bool {
    match stored {
        None => true,
        Some(stored) => {
            fetched.version > stored.version
                || (stored.pending && fetched.version >= stored.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(version: i64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            pending: true,
            ..Snapshot::scaffold(version)
        })
    }

    #[test]
    fn empty_store_accepts_anything() {
        let store = SnapshotStore::new();
        assert_eq!(store.version(), UNVERSIONED);
        assert_eq!(
            store.offer(Arc::new(Snapshot::scaffold(4))),
            StoreOutcome::Replaced
        );
        assert_eq!(store.version(), 4);
    }

    #[test]
    fn lower_or_equal_versions_never_regress() {
        let store = SnapshotStore::new();
        store.offer(Arc::new(Snapshot::scaffold(10)));

        assert_eq!(store.offer(Arc::new(Snapshot::scaffold(9))), StoreOutcome::Kept);
        assert_eq!(store.offer(Arc::new(Snapshot::scaffold(10))), StoreOutcome::Kept);
        assert_eq!(store.version(), 10);
    }

    #[test]
    fn pending_snapshot_is_replaced_even_by_same_version() {
        let store = SnapshotStore::new();
        store.offer(pending(5));
        assert_eq!(
            store.offer(Arc::new(Snapshot::scaffold(5))),
            StoreOutcome::Replaced
        );
        assert!(!store.current().unwrap().pending);
    }

    #[test]
    fn pending_snapshot_is_never_replaced_by_a_lower_version() {
        let store = SnapshotStore::new();
        store.offer(pending(10));

        assert_eq!(store.offer(Arc::new(Snapshot::scaffold(9))), StoreOutcome::Kept);
        assert_eq!(store.version(), 10);
        assert!(store.current().unwrap().pending);

        assert_eq!(
            store.offer(Arc::new(Snapshot::scaffold(11))),
            StoreOutcome::Replaced
        );
        assert_eq!(store.version(), 11);
    }

    #[test]
    fn concurrent_offers_settle_on_the_maximum() {
        let store = Arc::new(SnapshotStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for v in 0..200 {
                        store.offer(Arc::new(Snapshot::scaffold(v * 8 + t)));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.version(), 199 * 8 + 7);
    }
}
