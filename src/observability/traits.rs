use std::time::Duration;

use crate::agent::state::{AgentMode, WaitCondition};
use crate::agent::wait::ForcedProgress;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    IterationStarted {
        iteration: u64,
        mode: AgentMode,
    },
    SnapshotAdvanced {
        version: i64,
    },
    WaitForcedProgress {
        condition: WaitCondition,
        action: ForcedProgress,
    },
    BrainFailure {
        iteration: u64,
        reason: String,
    },
    ActionSubmitted {
        iteration: u64,
        version: Option<i64>,
        delivered: usize,
        dropped: usize,
        fallback: bool,
    },
    HeartbeatSent {
        iteration: u64,
        success: bool,
    },
    Error {
        component: String,
        message: String,
    },
}

/// Numeric metrics
#[derive(Debug, Clone)]
pub enum ObserverMetric {
    BrainLatency(Duration),
    /// `last_version_seen - last_version_at_action` when an iteration starts.
    VersionGap(i64),
}

/// Sink for scheduler events and metrics
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Record a numeric metric
    fn record_metric(&self, metric: &ObserverMetric);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
