use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

use crate::agent::state::AgentMode;
use crate::brain::Action;
use crate::canvas::{CanvasView, Neighbor};
use crate::snapshot::Snapshot;

/// Strategy records kept in memory.
const HISTORY_CAPACITY: usize = 50;
/// Strategy records handed to the Brain.
const HISTORY_IN_CONTEXT: usize = 10;
/// Distinct-version errors averaged into the rolling error.
const ERROR_WINDOW: usize = 10;
/// Known colours handed to the Brain.
const PALETTE_LIMIT: usize = 12;
/// Own cells handed to the Brain; a full grid is 400.
const OWN_PIXELS_LIMIT: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyRecord {
    pub iteration: u64,
    pub version: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    pub mutations: usize,
}

/// Everything the Brain sees for one decision.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBundle {
    pub agent_id: String,
    pub mode: AgentMode,
    pub position: [i32; 2],
    pub iteration: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<Snapshot>,
    pub prev_predictions: Value,
    pub strategy_history: Vec<StrategyRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_error: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolling_prediction_error: Option<f64>,
    pub palette: Vec<String>,
    /// What this agent has already drawn, as `"x,y#RRGGBB"`.
    pub own_pixels: Vec<String>,
    pub neighbor_colors: BTreeMap<Neighbor, Vec<String>>,
}

/// Iteration-to-iteration memory owned by the scheduler.
#[derive(Debug, Default)]
pub struct AgentMemory {
    history: VecDeque<StrategyRecord>,
    prev_predictions: Value,
    errors: VecDeque<(i64, f64)>,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember an action. `version` is `None` for the seed.
    pub fn record_action(&mut self, iteration: u64, version: Option<i64>, action: &Action) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(StrategyRecord {
            iteration,
            version: version.unwrap_or(crate::snapshot::UNVERSIONED),
            strategy_id: action.strategy_id.clone(),
            strategy: action.strategy.clone(),
            mutations: action.mutations.len(),
        });
        if !action.predictions.is_null() {
            self.prev_predictions = action.predictions.clone();
        }
    }

    /// Track this agent's error as scored in `snapshot`. Repeated versions
    /// count once.
    pub fn record_prediction_error(&mut self, agent_id: &str, snapshot: &Snapshot) {
        let Some(scored) = snapshot.prediction_error_for(agent_id) else {
            return;
        };
        if self
            .errors
            .back()
            .is_some_and(|(version, _)| *version == snapshot.version)
        {
            return;
        }
        if self.errors.len() == ERROR_WINDOW {
            self.errors.pop_front();
        }
        self.errors.push_back((snapshot.version, scored.error));
    }

    pub fn latest_error(&self) -> Option<f64> {
        self.errors.back().map(|(_, e)| *e)
    }

    pub fn rolling_error(&self) -> Option<f64> {
        if self.errors.is_empty() {
            return None;
        }
        let sum: f64 = self.errors.iter().map(|(_, e)| e).sum();
        #[allow(clippy::cast_precision_loss)]
        Some(sum / self.errors.len() as f64)
    }

    pub fn recent_history(&self) -> Vec<StrategyRecord> {
        let skip = self.history.len().saturating_sub(HISTORY_IN_CONTEXT);
        self.history.iter().skip(skip).cloned().collect()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn build_context(
        &self,
        agent_id: &str,
        mode: AgentMode,
        iteration: u64,
        snapshot: Option<&Snapshot>,
        view: &CanvasView,
    ) -> ContextBundle {
        let (x, y) = view.position().unwrap_or_default();
        ContextBundle {
            agent_id: agent_id.to_string(),
            mode,
            position: [x, y],
            iteration,
            snapshot: snapshot.cloned(),
            prev_predictions: self.prev_predictions.clone(),
            strategy_history: self.recent_history(),
            prediction_error: self.latest_error(),
            rolling_prediction_error: self.rolling_error(),
            palette: view.known_colors(PALETTE_LIMIT),
            own_pixels: view.palette_summary(OWN_PIXELS_LIMIT),
            neighbor_colors: view.neighbor_colors(),
        }
    }
}
