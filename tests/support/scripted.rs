#![allow(dead_code)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tokio::time::Instant;

use poietic_agent::agent::{ActionSubmitter, AgentMode, AgentScheduler, AgentState, SchedulerDeps};
use poietic_agent::brain::{Action, Brain, ContextBundle};
use poietic_agent::canvas::{CanvasView, OutboundFrame, PixelMutation};
use poietic_agent::config::{SchedulerConfig, SubmitterConfig};
use poietic_agent::error::{ChannelError, ObservationError};
use poietic_agent::observability::NoopObserver;
use poietic_agent::snapshot::{Snapshot, SnapshotClient, SnapshotStore};
use poietic_agent::transport::{ActionReport, CanvasChannel, ObservationApi};

pub fn valid_snapshot(version: i64) -> Snapshot {
    let mut snapshot = Snapshot::scaffold(version);
    snapshot.structures.push(json!({"type": "cluster", "version": version}));
    snapshot
}

/// Publishes a new valid version every `period`, starting at version 1
/// when the feed is created.
pub struct TickingFeed {
    started: Instant,
    period_ms: u128,
    fetches: AtomicUsize,
    pub reports: Mutex<Vec<ActionReport>>,
}

impl TickingFeed {
    pub fn new(period: std::time::Duration) -> Self {
        Self {
            started: Instant::now(),
            period_ms: period.as_millis().max(1),
            fetches: AtomicUsize::new(0),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub fn current_version(&self) -> i64 {
        let ticks = self.started.elapsed().as_millis() / self.period_ms;
        i64::try_from(ticks).unwrap_or(i64::MAX) + 1
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl ObservationApi for TickingFeed {
    fn latest<'a>(
        &'a self,
        _agent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Snapshot, ObservationError>> + Send + 'a>> {
        Box::pin(async move {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(valid_snapshot(self.current_version()))
        })
    }

    fn report<'a>(
        &'a self,
        report: &'a ActionReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), ObservationError>> + Send + 'a>> {
        Box::pin(async move {
            self.reports.lock().unwrap().push(report.clone());
            Ok(())
        })
    }
}

#[derive(Default)]
pub struct RecordingChannel {
    pub frames: Mutex<Vec<OutboundFrame>>,
}

impl RecordingChannel {
    pub fn cell_updates(&self) -> usize {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|f| matches!(f, OutboundFrame::CellUpdate { .. }))
            .count()
    }
}

impl CanvasChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn send_frame<'a>(
        &'a self,
        frame: &'a OutboundFrame,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            self.frames.lock().unwrap().push(frame.clone());
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        true
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async {})
    }
}

/// Draws `pixels` cells per call (zero means always empty) and records the
/// snapshot version of every context it is handed.
pub struct ScriptedBrain {
    pixels: usize,
    seen: Mutex<Vec<(AgentMode, Option<i64>)>>,
}

impl ScriptedBrain {
    pub fn drawing(pixels: usize) -> Self {
        Self {
            pixels,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn acted_versions(&self) -> Vec<i64> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(mode, v)| (*mode == AgentMode::Action).then_some(*v).flatten())
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl Brain for ScriptedBrain {
    fn name(&self) -> &str {
        "scripted"
    }

    fn decide<'a>(
        &'a self,
        mode: AgentMode,
        context: &'a ContextBundle,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Action>> + Send + 'a>> {
        Box::pin(async move {
            self.seen
                .lock()
                .unwrap()
                .push((mode, context.snapshot.as_ref().map(|s| s.version)));
            let offset = i32::try_from(context.iteration % 20).unwrap_or(0);
            let mutations = (0..self.pixels)
                .map(|i| PixelMutation::new(offset, i32::try_from(i).unwrap_or(0), "#3366CC"))
                .collect();
            Ok(Action {
                strategy_id: Some("scripted".into()),
                mutations,
                ..Action::default()
            })
        })
    }
}

pub struct Agent {
    pub scheduler: AgentScheduler,
    pub state: Arc<AgentState>,
    pub brain: Arc<ScriptedBrain>,
    pub channel: Arc<RecordingChannel>,
}

pub fn agent(
    id: &str,
    api: Arc<dyn ObservationApi>,
    brain: ScriptedBrain,
    config: SchedulerConfig,
) -> Agent {
    let state = Arc::new(AgentState::new());
    state.set_running(true);
    let view = Arc::new(CanvasView::new());
    let channel = Arc::new(RecordingChannel::default());
    let brain = Arc::new(brain);

    let deps = SchedulerDeps {
        client: Arc::new(SnapshotClient::new(
            Arc::clone(&api),
            Arc::new(SnapshotStore::new()),
            Arc::clone(&state),
        )),
        api,
        brain: Arc::clone(&brain) as Arc<dyn Brain>,
        submitter: Arc::new(ActionSubmitter::new(
            Arc::clone(&channel) as Arc<dyn CanvasChannel>,
            Arc::clone(&view),
            SubmitterConfig::default(),
        )),
        view,
        state: Arc::clone(&state),
        observer: Arc::new(NoopObserver),
    };

    Agent {
        scheduler: AgentScheduler::new(id, deps, config),
        state,
        brain,
        channel,
    }
}
