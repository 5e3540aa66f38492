use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::store::{SnapshotStore, StoreOutcome};
use super::types::Snapshot;
use crate::agent::state::AgentState;
use crate::error::ObservationError;
use crate::transport::ObservationApi;

/// How fresh an observation must be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMode {
    /// The stored snapshot is fine while the poller keeps it current.
    Cached,
    /// Always ask the Observation Service.
    Fresh,
}

/// Retrieves snapshots and keeps the store and version counters current.
pub struct SnapshotClient {
    api: Arc<dyn ObservationApi>,
    store: Arc<SnapshotStore>,
    state: Arc<AgentState>,
    poller_active: AtomicBool,
}

impl SnapshotClient {
    pub fn new(
        api: Arc<dyn ObservationApi>,
        store: Arc<SnapshotStore>,
        state: Arc<AgentState>,
    ) -> Self {
        Self {
            api,
            store,
            state,
            poller_active: AtomicBool::new(false),
        }
    }

    /// Fetch the newest snapshot.
    ///
    /// Returns what the service sent, even when the store keeps an older
    /// copy because the fetched one would regress it. `last_version_seen` is
    /// raised either way.
    pub async fn fetch(&self, agent_id: &str) -> Result<Arc<Snapshot>, ObservationError> {
        let fetched = Arc::new(self.api.latest(agent_id).await?);

        let previous = self.state.observe_version(fetched.version);
        if fetched.version > previous {
            tracing::debug!(
                version = fetched.version,
                previous,
                "Observed newer snapshot version"
            );
        }

        if self.store.offer(Arc::clone(&fetched)) == StoreOutcome::Kept
            && fetched.version < self.store.version()
        {
            tracing::debug!(
                fetched = fetched.version,
                stored = self.store.version(),
                "Fetched snapshot is older than stored; not replacing"
            );
        }
        Ok(fetched)
    }

    /// Best available snapshot for `mode`. Fetch failures fall back to the
    /// stored snapshot.
    pub async fn observe(&self, agent_id: &str, mode: ProbeMode) -> Option<Arc<Snapshot>> {
        if mode == ProbeMode::Cached
            && self.is_poller_active()
            && let Some(cached) = self.store.current()
        {
            return Some(cached);
        }

        match self.fetch(agent_id).await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Snapshot fetch failed: {e}");
                self.store.current()
            }
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn set_poller_active(&self, active: bool) {
        self.poller_active.store(active, Ordering::Release);
    }

    pub fn is_poller_active(&self) -> bool {
        self.poller_active.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::transport::ActionReport;

    /// Serves a fixed list of versions, repeating the last.
    struct VersionFeed {
        versions: Mutex<VecDeque<i64>>,
    }

    impl VersionFeed {
        fn new(versions: &[i64]) -> Self {
            Self {
                versions: Mutex::new(versions.iter().copied().collect()),
            }
        }
    }

    impl ObservationApi for VersionFeed {
        fn latest<'a>(
            &'a self,
            _agent_id: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Snapshot, ObservationError>> + Send + 'a>> {
            Box::pin(async move {
                let mut versions = self.versions.lock().unwrap();
                let version = if versions.len() > 1 {
                    versions.pop_front()
                } else {
                    versions.front().copied()
                };
                version
                    .map(Snapshot::scaffold)
                    .ok_or(ObservationError::Status(503))
            })
        }

        fn report<'a>(
            &'a self,
            _report: &'a ActionReport,
        ) -> Pin<Box<dyn Future<Output = Result<(), ObservationError>> + Send + 'a>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn client(versions: &[i64]) -> (SnapshotClient, Arc<AgentState>) {
        let state = Arc::new(AgentState::new());
        let client = SnapshotClient::new(
            Arc::new(VersionFeed::new(versions)),
            Arc::new(SnapshotStore::new()),
            Arc::clone(&state),
        );
        (client, state)
    }

    #[tokio::test]
    async fn last_seen_tracks_maximum_fetched_version() {
        let (client, state) = client(&[3, 8, 2, 8, 5]);
        for _ in 0..5 {
            client.fetch("a").await.unwrap();
        }
        assert_eq!(state.last_version_seen(), 8);
        assert_eq!(client.store().version(), 8);
    }

    #[tokio::test]
    async fn fetch_returns_the_fetched_snapshot_even_when_rejected() {
        let (client, _) = client(&[10, 9]);
        client.fetch("a").await.unwrap();
        let second = client.fetch("a").await.unwrap();
        assert_eq!(second.version, 9);
        assert_eq!(client.store().version(), 10);
    }

    #[tokio::test]
    async fn cached_probe_uses_store_only_while_poller_runs() {
        let (client, _) = client(&[4, 6]);
        client.fetch("a").await.unwrap();

        client.set_poller_active(true);
        let cached = client.observe("a", ProbeMode::Cached).await.unwrap();
        assert_eq!(cached.version, 4);

        client.set_poller_active(false);
        let fresh = client.observe("a", ProbeMode::Cached).await.unwrap();
        assert_eq!(fresh.version, 6);
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_store() {
        let (client, _) = client(&[]);
        assert!(client.observe("a", ProbeMode::Fresh).await.is_none());
    }
}
