use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use super::state::AgentState;
use crate::canvas::{CanvasView, OutboundFrame};
use crate::config::HeartbeatConfig;
use crate::diagnostics::health;
use crate::observability::{Observer, ObserverEvent};
use crate::transport::{ActionReport, CanvasChannel, ObservationApi};

/// Why a heartbeat was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatOutcome {
    Sent,
    Failed,
    SkippedPaused,
    SkippedNoIdentity,
}

/// Tells the Observation Service this agent is alive while it thinks, and
/// keeps the canvas connection from idling out.
///
/// Reads [`AgentState`] and the [`CanvasView`] but never writes scheduler
/// state. Failures are logged and forgotten.
pub struct HeartbeatEmitter {
    api: Arc<dyn ObservationApi>,
    channel: Arc<dyn CanvasChannel>,
    view: Arc<CanvasView>,
    state: Arc<AgentState>,
    observer: Arc<dyn Observer>,
    config: HeartbeatConfig,
}

impl HeartbeatEmitter {
    pub fn new(
        api: Arc<dyn ObservationApi>,
        channel: Arc<dyn CanvasChannel>,
        view: Arc<CanvasView>,
        state: Arc<AgentState>,
        observer: Arc<dyn Observer>,
        config: HeartbeatConfig,
    ) -> Self {
        Self {
            api,
            channel,
            view,
            state,
            observer,
            config,
        }
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut beat = interval(Duration::from_secs(self.config.interval_secs.max(1)));
        let mut keepalive = interval(Duration::from_secs(
            self.config.channel_keepalive_secs.max(1),
        ));
        beat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // both intervals fire immediately; the first real beat is one period in
        beat.tick().await;
        keepalive.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = beat.tick() => {
                    self.beat().await;
                }
                _ = keepalive.tick() => {
                    self.keepalive().await;
                }
            }
        }
        tracing::debug!("Heartbeat emitter stopped");
    }

    /// Send one liveness report.
    pub async fn beat(&self) -> BeatOutcome {
        if !self.state.is_running() || self.state.is_paused() {
            return BeatOutcome::SkippedPaused;
        }
        let (Some(agent_id), Some(position)) = (self.view.identity(), self.view.position()) else {
            tracing::debug!("Skipping heartbeat; canvas position not received yet");
            return BeatOutcome::SkippedNoIdentity;
        };

        let iteration = self.state.iteration();
        let report = ActionReport::heartbeat(agent_id, position, iteration);
        let outcome = match self.api.report(&report).await {
            Ok(()) => {
                health::mark_component_ok("heartbeat");
                BeatOutcome::Sent
            }
            Err(e) => {
                tracing::warn!("Heartbeat failed: {e}");
                health::mark_component_error("heartbeat", &e);
                BeatOutcome::Failed
            }
        };
        self.observer.record_event(&ObserverEvent::HeartbeatSent {
            iteration,
            success: outcome == BeatOutcome::Sent,
        });
        outcome
    }

    /// Ping the canvas channel so the server keeps the connection.
    pub async fn keepalive(&self) {
        if !self.channel.is_open() {
            return;
        }
        if let Err(e) = self.channel.send_frame(&OutboundFrame::Heartbeat).await {
            tracing::debug!("Canvas keepalive failed: {e}");
        }
    }
}
