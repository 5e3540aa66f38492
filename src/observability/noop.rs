use super::traits::{Observer, ObserverEvent, ObserverMetric};

/// Discards everything. Selected by `backend = "none"` and used by tests
/// that only care about scheduler state.
pub struct NoopObserver;

impl Observer for NoopObserver {
    #[inline]
    fn record_event(&self, _event: &ObserverEvent) {}

    #[inline]
    fn record_metric(&self, _metric: &ObserverMetric) {}

    fn name(&self) -> &str {
        "noop"
    }
}
