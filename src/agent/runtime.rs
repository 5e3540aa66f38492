use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::heartbeat::HeartbeatEmitter;
use super::poller::SnapshotPoller;
use super::scheduler::{AgentScheduler, SchedulerDeps};
use super::state::AgentState;
use super::submitter::ActionSubmitter;
use crate::brain::{Brain, create_brain};
use crate::canvas::CanvasView;
use crate::config::Config;
use crate::error::Result;
use crate::observability::{Observer, create_observer};
use crate::platform::daemon::spawn_component_supervisor;
use crate::snapshot::{SnapshotClient, SnapshotStore};
use crate::transport::{CanvasChannel, HttpObservationApi, ObservationApi, WsCanvasChannel};

/// Canvas reconnects forever; only cancellation stops it.
const CANVAS_MAX_RESTARTS: u32 = 0;

/// One agent process: the scheduler plus the background tasks that feed it.
pub struct AgentRuntime {
    config: Arc<Config>,
    fallback_id: String,
    state: Arc<AgentState>,
    view: Arc<CanvasView>,
    channel: Arc<WsCanvasChannel>,
    client: Arc<SnapshotClient>,
    api: Arc<dyn ObservationApi>,
    observer: Arc<dyn Observer>,
    scheduler: AgentScheduler,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl AgentRuntime {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        config.validate()?;
        let brain = create_brain(&config.brain)?;
        let api: Arc<dyn ObservationApi> = Arc::new(HttpObservationApi::new(&config.observation)?);
        Ok(Self::with_collaborators(config, api, brain))
    }

    /// Wire a runtime around caller-supplied collaborators.
    pub fn with_collaborators(
        config: Arc<Config>,
        api: Arc<dyn ObservationApi>,
        brain: Arc<dyn Brain>,
    ) -> Self {
        let fallback_id = config
            .agent_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let state = Arc::new(AgentState::new());
        let view = Arc::new(CanvasView::new());
        let channel = Arc::new(WsCanvasChannel::new(config.canvas.url.clone(), Arc::clone(&view)));
        let client = Arc::new(SnapshotClient::new(
            Arc::clone(&api),
            Arc::new(SnapshotStore::new()),
            Arc::clone(&state),
        ));
        let observer = create_observer(&config.observability);
        let submitter = Arc::new(ActionSubmitter::new(
            Arc::clone(&channel) as Arc<dyn CanvasChannel>,
            Arc::clone(&view),
            config.submitter.clone(),
        ));

        let deps = SchedulerDeps {
            client: Arc::clone(&client),
            api: Arc::clone(&api),
            brain,
            submitter,
            view: Arc::clone(&view),
            state: Arc::clone(&state),
            observer: Arc::clone(&observer),
        };
        let scheduler = AgentScheduler::new(fallback_id.clone(), deps, config.scheduler.clone());

        Self {
            config,
            fallback_id,
            state,
            view,
            channel,
            client,
            api,
            observer,
            scheduler,
            cancel: CancellationToken::new(),
            tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> Arc<AgentState> {
        Arc::clone(&self.state)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn fallback_id(&self) -> &str {
        &self.fallback_id
    }

    /// Mark the agent running and spawn the canvas reader, snapshot poller
    /// and heartbeat emitter.
    pub fn start(&mut self) {
        self.state.set_running(true);
        tracing::info!(agent_id = %self.fallback_id, "Agent starting");

        let channel = Arc::clone(&self.channel);
        let cancel = self.cancel.clone();
        self.tasks.push(spawn_component_supervisor(
            "canvas",
            self.config.canvas.reconnect_initial_backoff_secs,
            self.config.canvas.reconnect_max_backoff_secs,
            CANVAS_MAX_RESTARTS,
            self.cancel.clone(),
            move || {
                let channel = Arc::clone(&channel);
                let cancel = cancel.clone();
                async move { channel.connect_and_listen(&cancel).await }
            },
        ));

        let poller = SnapshotPoller::new(
            Arc::clone(&self.client),
            Arc::clone(&self.view),
            self.fallback_id.clone(),
            Arc::clone(&self.observer),
            self.config.poller.interval_secs,
        );
        self.tasks.push(poller.spawn(self.cancel.clone()));

        if self.config.heartbeat.enabled {
            let heartbeat = Arc::new(HeartbeatEmitter::new(
                Arc::clone(&self.api),
                Arc::clone(&self.channel) as Arc<dyn CanvasChannel>,
                Arc::clone(&self.view),
                Arc::clone(&self.state),
                Arc::clone(&self.observer),
                self.config.heartbeat.clone(),
            ));
            self.tasks.push(heartbeat.spawn(self.cancel.clone()));
        }
    }

    /// Wait out the start-up jitter, then drive the scheduler until the
    /// token is cancelled or `max_iterations` have run.
    pub async fn run(&mut self, max_iterations: Option<u64>) {
        let jitter_ms = self.config.scheduler.startup_jitter_ms;
        if jitter_ms > 0 {
            let delay = rand::rng().random_range(0..jitter_ms);
            tracing::debug!(delay_ms = delay, "Start-up jitter");
            tokio::select! {
                () = self.cancel.cancelled() => return,
                () = tokio::time::sleep(Duration::from_millis(delay)) => {}
            }
        }
        self.scheduler.run(&self.cancel, max_iterations).await;
    }

    /// Stop everything and close the canvas channel. In-flight Brain
    /// results are discarded by the scheduler once `running` is clear.
    pub async fn stop(&mut self) {
        self.state.set_running(false);
        self.channel.close().await;
        self.cancel.cancel();
        for handle in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                tracing::warn!("Background task ended abnormally: {e}");
            }
        }
        self.observer.flush();
        tracing::info!(
            iterations = self.state.iteration(),
            last_version_at_action = self.state.last_version_at_action(),
            "Agent stopped"
        );
    }
}
