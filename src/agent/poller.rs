use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::canvas::CanvasView;
use crate::diagnostics::health;
use crate::observability::{Observer, ObserverEvent};
use crate::snapshot::SnapshotClient;

/// Background task that keeps the snapshot store fresh between scheduler
/// probes.
pub struct SnapshotPoller {
    client: Arc<SnapshotClient>,
    view: Arc<CanvasView>,
    fallback_id: String,
    observer: Arc<dyn Observer>,
    interval: Duration,
}

impl SnapshotPoller {
    pub fn new(
        client: Arc<SnapshotClient>,
        view: Arc<CanvasView>,
        fallback_id: String,
        observer: Arc<dyn Observer>,
        interval_secs: u64,
    ) -> Self {
        Self {
            client,
            view,
            fallback_id,
            observer,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.client.set_poller_active(true);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.poll_once().await,
            }
        }

        self.client.set_poller_active(false);
        tracing::debug!("Snapshot poller stopped");
    }

    pub async fn poll_once(&self) {
        let agent_id = self.view.identity().unwrap_or_else(|| self.fallback_id.clone());
        let stored_before = self.client.store().version();

        match self.client.fetch(&agent_id).await {
            Ok(snapshot) => {
                health::mark_component_ok("poller");
                if snapshot.pending {
                    tracing::debug!(version = snapshot.version, "Snapshot still pending");
                    return;
                }
                if snapshot.version > stored_before {
                    self.observer.record_event(&ObserverEvent::SnapshotAdvanced {
                        version: snapshot.version,
                    });
                    if let Some(scored) = snapshot.prediction_error_for(&agent_id) {
                        tracing::info!(
                            version = snapshot.version,
                            error = scored.error,
                            "Own prediction error"
                        );
                    }
                }
            }
            Err(e) => {
                tracing::warn!("Snapshot poll failed: {e}");
                health::mark_component_error("poller", &e);
                self.observer.record_event(&ObserverEvent::Error {
                    component: "poller".into(),
                    message: e.to_string(),
                });
            }
        }
    }
}
