//! The per-agent scheduling loop.
//!
//! Each iteration either seeds (iteration 0) or walks
//! `AWAIT_VALID → AWAIT_NEWER/AWAIT_UNACTED → ACT`. Eligibility to act is
//! decided from this agent's own counters only: other agents acting on the
//! same version neither block nor are blocked by this one.

pub mod context;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::state::{AgentMode, AgentState, WaitCondition};
use super::submitter::{ActionSubmitter, SubmitReport};
use super::wait::{BehindRule, BoundedWaitPolicy, ForcedProgress, Probe, WaitOutcome};
use crate::brain::{Action, Brain};
use crate::canvas::CanvasView;
use crate::config::SchedulerConfig;
use crate::diagnostics::health;
use crate::error::BrainError;
use crate::observability::{Observer, ObserverEvent, ObserverMetric};
use crate::snapshot::{Snapshot, SnapshotClient};
use crate::transport::{ActionReport, ObservationApi};
pub use context::{AgentMemory, ContextBundle, StrategyRecord};

/// How one iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub enum IterationOutcome {
    Seeded {
        report: SubmitReport,
    },
    Acted {
        version: Option<i64>,
        report: SubmitReport,
    },
    /// A version wait ran out of budget; the Brain was not called.
    Skipped {
        condition: WaitCondition,
        report: SubmitReport,
    },
    /// The agent stopped while the Brain was thinking.
    Discarded,
}

/// Collaborators shared with the rest of the runtime.
#[derive(Clone)]
pub struct SchedulerDeps {
    pub client: Arc<SnapshotClient>,
    pub api: Arc<dyn ObservationApi>,
    pub brain: Arc<dyn Brain>,
    pub submitter: Arc<ActionSubmitter>,
    pub view: Arc<CanvasView>,
    pub state: Arc<AgentState>,
    pub observer: Arc<dyn Observer>,
}

pub struct AgentScheduler {
    fallback_id: String,
    deps: SchedulerDeps,
    config: SchedulerConfig,
    invalid_wait: BoundedWaitPolicy,
    stale_wait: BoundedWaitPolicy,
    same_wait: BoundedWaitPolicy,
    memory: AgentMemory,
}

impl AgentScheduler {
    pub fn new(fallback_id: impl Into<String>, deps: SchedulerDeps, config: SchedulerConfig) -> Self {
        let state = &deps.state;
        let invalid_wait = BoundedWaitPolicy::new(
            WaitCondition::InvalidSnapshot,
            config.invalid_wait,
            BehindRule::Ignore,
            ForcedProgress::ProceedWithLatest,
            Arc::clone(state),
        );
        let stale_wait = BoundedWaitPolicy::new(
            WaitCondition::StaleSnapshot,
            config.stale_wait,
            BehindRule::ShrinkWhenBehind,
            ForcedProgress::SkipIteration,
            Arc::clone(state),
        );
        let same_wait = BoundedWaitPolicy::new(
            WaitCondition::SameSnapshot,
            config.same_wait,
            BehindRule::ShrinkWhenBehind,
            ForcedProgress::SkipIteration,
            Arc::clone(state),
        );

        Self {
            fallback_id: fallback_id.into(),
            deps,
            config,
            invalid_wait,
            stale_wait,
            same_wait,
            memory: AgentMemory::new(),
        }
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    /// Identity assigned by the canvas, or the configured fallback.
    pub fn agent_id(&self) -> String {
        self.deps
            .view
            .identity()
            .unwrap_or_else(|| self.fallback_id.clone())
    }

    /// Run until cancelled, the running flag drops, or `max_iterations`
    /// iterations have completed.
    pub async fn run(&mut self, cancel: &CancellationToken, max_iterations: Option<u64>) {
        let pause_poll = Duration::from_millis(self.config.pause_poll_ms.max(1));
        let mut completed = 0_u64;

        while self.deps.state.is_running() && !cancel.is_cancelled() {
            if self.deps.state.is_paused() {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(pause_poll) => continue,
                }
            }

            let outcome = tokio::select! {
                () = cancel.cancelled() => break,
                outcome = self.run_iteration() => outcome,
            };
            tracing::debug!(?outcome, "Iteration finished");
            completed += 1;

            if max_iterations.is_some_and(|max| completed >= max) {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.config.iteration_interval()) => {}
            }
        }
        tracing::info!(iterations = completed, "Scheduler stopped");
    }

    /// One pass through the state machine, ending with the iteration
    /// counter advanced.
    pub async fn run_iteration(&mut self) -> IterationOutcome {
        let iteration = self.deps.state.iteration();
        let mode = if iteration == 0 {
            AgentMode::Seed
        } else {
            AgentMode::Action
        };
        self.deps.state.set_mode(mode);
        self.deps
            .observer
            .record_event(&ObserverEvent::IterationStarted { iteration, mode });
        self.deps.observer.record_metric(&ObserverMetric::VersionGap(
            self.deps.state.last_version_seen() - self.deps.state.last_version_at_action(),
        ));

        let outcome = match mode {
            AgentMode::Seed => self.seed().await,
            AgentMode::Action => self.act_when_eligible(iteration).await,
        };

        health::mark_component_ok("scheduler");
        self.deps.state.advance_iteration();
        outcome
    }

    async fn seed(&mut self) -> IterationOutcome {
        let agent_id = self.agent_id();
        let context =
            self.memory
                .build_context(&agent_id, AgentMode::Seed, 0, None, &self.deps.view);
        let action = self.call_brain(AgentMode::Seed, &context, 0).await;
        if !self.deps.state.is_running() {
            return IterationOutcome::Discarded;
        }

        let report = self
            .deps
            .submitter
            .submit(AgentMode::Seed, action.mutations.clone())
            .await;
        self.publish(&agent_id, 0, &action, &report).await;
        self.memory.record_action(0, None, &action);
        self.record_submission(0, None, &report);
        IterationOutcome::Seeded { report }
    }

    async fn act_when_eligible(&mut self, iteration: u64) -> IterationOutcome {
        let agent_id = self.agent_id();

        // AWAIT_VALID
        let snapshot = match self.await_valid(&agent_id).await {
            WaitOutcome::Ready(snapshot) => Some(snapshot),
            WaitOutcome::Forced { action, last } => {
                self.forced(WaitCondition::InvalidSnapshot, action);
                last
            }
        };

        // AWAIT_NEWER / AWAIT_UNACTED
        let snapshot = if iteration == 1 {
            snapshot
        } else {
            match self.await_unacted(&agent_id, snapshot).await {
                Ok(snapshot) => snapshot,
                Err(condition) => {
                    let report = self.deps.submitter.submit(AgentMode::Action, Vec::new()).await;
                    let skipped = Action::empty(format!("{condition} wait ran out"));
                    self.publish(&agent_id, iteration, &skipped, &report).await;
                    self.record_submission(iteration, None, &report);
                    return IterationOutcome::Skipped { condition, report };
                }
            }
        };

        self.act(&agent_id, iteration, snapshot).await
    }

    async fn await_valid(&self, agent_id: &str) -> WaitOutcome<Arc<Snapshot>> {
        let client = &*self.deps.client;
        self.invalid_wait
            .run(|mode| async move {
                match client.observe(agent_id, mode).await {
                    Some(snapshot) if snapshot.is_valid() => Probe::Ready(snapshot),
                    other => Probe::NotYet(other),
                }
            })
            .await
    }

    /// A snapshot newer than the last one acted on, or the wait that gave up.
    async fn await_unacted(
        &self,
        agent_id: &str,
        snapshot: Option<Arc<Snapshot>>,
    ) -> Result<Option<Arc<Snapshot>>, WaitCondition> {
        let acted = self.deps.state.last_version_at_action();
        let version = snapshot
            .as_ref()
            .map_or(crate::snapshot::UNVERSIONED, |s| s.version);
        if version > acted {
            return Ok(snapshot);
        }

        let policy = if version < acted {
            tracing::info!(version, acted, "Snapshot older than last action; waiting");
            &self.stale_wait
        } else {
            tracing::debug!(version, "Already acted on this version; waiting");
            &self.same_wait
        };

        let client = &*self.deps.client;
        let outcome = policy
            .run(|mode| async move {
                match client.observe(agent_id, mode).await {
                    Some(s) if s.is_valid() && s.version > acted => Probe::Ready(s),
                    other => Probe::NotYet(other),
                }
            })
            .await;

        match outcome {
            WaitOutcome::Ready(snapshot) => Ok(Some(snapshot)),
            WaitOutcome::Forced { action, .. } => {
                self.forced(policy.condition(), action);
                Err(policy.condition())
            }
        }
    }

    async fn act(
        &mut self,
        agent_id: &str,
        iteration: u64,
        snapshot: Option<Arc<Snapshot>>,
    ) -> IterationOutcome {
        if let Some(snapshot) = &snapshot {
            self.memory.record_prediction_error(agent_id, snapshot);
        }
        let version = snapshot.as_ref().map(|s| s.version);

        let context = self.memory.build_context(
            agent_id,
            AgentMode::Action,
            iteration,
            snapshot.as_deref(),
            &self.deps.view,
        );
        let action = self.call_brain(AgentMode::Action, &context, iteration).await;
        if !self.deps.state.is_running() {
            tracing::info!(iteration, "Agent stopped during brain call; discarding result");
            return IterationOutcome::Discarded;
        }

        let report = self
            .deps
            .submitter
            .submit(AgentMode::Action, action.mutations.clone())
            .await;
        if let Some(version) = version {
            self.deps.state.record_action(version);
        }
        self.publish(agent_id, iteration, &action, &report).await;
        self.memory.record_action(iteration, version, &action);
        self.record_submission(iteration, version, &report);

        IterationOutcome::Acted { version, report }
    }

    /// Ask the Brain, bounded by the scheduler's own timeout. Any failure
    /// becomes an empty action.
    async fn call_brain(&self, mode: AgentMode, context: &ContextBundle, iteration: u64) -> Action {
        let started = Instant::now();
        let result = tokio::time::timeout(
            self.config.brain_timeout(),
            self.deps.brain.decide(mode, context),
        )
        .await;
        self.deps
            .observer
            .record_metric(&ObserverMetric::BrainLatency(started.elapsed()));

        let failure = match result {
            Ok(Ok(action)) => {
                health::mark_component_ok("brain");
                return action;
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => BrainError::Timeout {
                secs: self.config.brain_timeout().as_secs(),
            }
            .to_string(),
        };

        tracing::warn!(iteration, brain = self.deps.brain.name(), "Brain failed: {failure}");
        health::mark_component_error("brain", &failure);
        self.deps.observer.record_event(&ObserverEvent::BrainFailure {
            iteration,
            reason: failure.clone(),
        });
        Action::empty(failure)
    }

    /// Best-effort report of the action to the Observation Service. A
    /// fallback iteration reports the cells that were actually drawn.
    async fn publish(&self, agent_id: &str, iteration: u64, action: &Action, report: &SubmitReport) {
        if report.delivered == 0 && action.is_empty() {
            return;
        }
        let pixels = if report.fallback_used {
            report.pixels()
        } else {
            action.pixels()
        };
        let (x, y) = self.deps.view.position().unwrap_or_default();
        let body = ActionReport {
            agent_id: agent_id.to_string(),
            position: [x, y],
            iteration,
            is_heartbeat: false,
            strategy: action.strategy.clone(),
            strategy_id: action.strategy_id.clone(),
            rationale: action.rationale.clone(),
            predictions: action.predictions.clone(),
            delta_complexity: action.delta_complexity.clone(),
            pixels,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.deps.api.report(&body).await {
            tracing::warn!(iteration, "Failed to report action: {e}");
        }
    }

    fn forced(&self, condition: WaitCondition, action: ForcedProgress) {
        self.deps
            .observer
            .record_event(&ObserverEvent::WaitForcedProgress { condition, action });
    }

    fn record_submission(&self, iteration: u64, version: Option<i64>, report: &SubmitReport) {
        self.deps.observer.record_event(&ObserverEvent::ActionSubmitted {
            iteration,
            version,
            delivered: report.delivered,
            dropped: report.dropped,
            fallback: report.fallback_used,
        });
    }
}
