use super::traits::{Observer, ObserverEvent, ObserverMetric};
use tracing::{info, warn};

/// Observer that writes every event through `tracing`.
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::IterationStarted { iteration, mode } => {
                info!(iteration, mode = %mode, "iteration.start");
            }
            ObserverEvent::SnapshotAdvanced { version } => {
                info!(version, "snapshot.advanced");
            }
            ObserverEvent::WaitForcedProgress { condition, action } => {
                warn!(condition = %condition, action = %action, "wait.forced_progress");
            }
            ObserverEvent::BrainFailure { iteration, reason } => {
                warn!(iteration, reason = %reason, "brain.failure");
            }
            ObserverEvent::ActionSubmitted {
                iteration,
                version,
                delivered,
                dropped,
                fallback,
            } => {
                info!(
                    iteration,
                    version = ?version,
                    delivered,
                    dropped,
                    fallback,
                    "action.submitted"
                );
            }
            ObserverEvent::HeartbeatSent { iteration, success } => {
                info!(iteration, success, "heartbeat.sent");
            }
            ObserverEvent::Error { component, message } => {
                warn!(component = %component, error = %message, "error");
            }
        }
    }

    fn record_metric(&self, metric: &ObserverMetric) {
        match metric {
            ObserverMetric::BrainLatency(d) => {
                let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
                info!(latency_ms = ms, "metric.brain_latency");
            }
            ObserverMetric::VersionGap(gap) => {
                info!(gap, "metric.version_gap");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
