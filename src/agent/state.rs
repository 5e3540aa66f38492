use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU8, AtomicU32, AtomicU64, Ordering};

use crate::snapshot::UNVERSIONED;

/// What the agent is doing on the current iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentMode {
    Seed,
    Action,
}

/// The three conditions a scheduler iteration can wait on. Each owns its own
/// attempt counter so one wait never eats another's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WaitCondition {
    /// Snapshot pending or only a scaffold.
    InvalidSnapshot,
    /// Snapshot older than the one last acted on.
    StaleSnapshot,
    /// Snapshot already acted on.
    SameSnapshot,
}

impl WaitCondition {
    pub const ALL: [Self; 3] = [
        Self::InvalidSnapshot,
        Self::StaleSnapshot,
        Self::SameSnapshot,
    ];

    const fn index(self) -> usize {
        match self {
            Self::InvalidSnapshot => 0,
            Self::StaleSnapshot => 1,
            Self::SameSnapshot => 2,
        }
    }
}

const MODE_SEED: u8 = 0;
const MODE_ACTION: u8 = 1;

/// Mutable agent state shared between the scheduler and the background tasks.
///
/// Version fields only ever move up: every write is a `fetch_max`, so the
/// poller and the scheduler can race without one undoing the other.
#[derive(Debug)]
pub struct AgentState {
    last_version_seen: AtomicI64,
    last_version_at_action: AtomicI64,
    iteration: AtomicU64,
    mode: AtomicU8,
    attempts: [AtomicU32; 3],
    running: AtomicBool,
    paused: AtomicBool,
}

impl Default for AgentState {
    fn default() -> Self {
        Self {
            last_version_seen: AtomicI64::new(UNVERSIONED),
            last_version_at_action: AtomicI64::new(UNVERSIONED),
            iteration: AtomicU64::new(0),
            mode: AtomicU8::new(MODE_SEED),
            attempts: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
            running: AtomicBool::new(false),
            paused: AtomicBool::new(false),
        }
    }
}

impl AgentState {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Versions ──────────────────────────────────────────────────────────

    pub fn last_version_seen(&self) -> i64 {
        self.last_version_seen.load(Ordering::Acquire)
    }

    pub fn last_version_at_action(&self) -> i64 {
        self.last_version_at_action.load(Ordering::Acquire)
    }

    /// Raise `last_version_seen` to `version` if it is higher. Returns the
    /// previous value.
    pub fn observe_version(&self, version: i64) -> i64 {
        self.last_version_seen.fetch_max(version, Ordering::AcqRel)
    }

    /// Mark `version` as acted upon.
    pub fn record_action(&self, version: i64) {
        // seen first, so `at_action <= seen` holds for every reader
        self.last_version_seen.fetch_max(version, Ordering::AcqRel);
        self.last_version_at_action
            .fetch_max(version, Ordering::AcqRel);
    }

    /// A newer version than the last one acted on is already known.
    pub fn is_behind(&self) -> bool {
        self.last_version_seen() > self.last_version_at_action()
    }

    // ── Iterations ────────────────────────────────────────────────────────

    pub fn iteration(&self) -> u64 {
        self.iteration.load(Ordering::Acquire)
    }

    /// Move to the next iteration, returning the new count.
    pub fn advance_iteration(&self) -> u64 {
        self.iteration.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn mode(&self) -> AgentMode {
        match self.mode.load(Ordering::Acquire) {
            MODE_SEED => AgentMode::Seed,
            _ => AgentMode::Action,
        }
    }

    pub fn set_mode(&self, mode: AgentMode) {
        let raw = match mode {
            AgentMode::Seed => MODE_SEED,
            AgentMode::Action => MODE_ACTION,
        };
        self.mode.store(raw, Ordering::Release);
    }

    // ── Wait counters ─────────────────────────────────────────────────────

    pub fn attempts(&self, condition: WaitCondition) -> u32 {
        self.attempts[condition.index()].load(Ordering::Acquire)
    }

    /// Count one more failed attempt, returning the new total.
    pub fn bump_attempt(&self, condition: WaitCondition) -> u32 {
        self.attempts[condition.index()].fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn reset_attempts(&self, condition: WaitCondition) {
        self.attempts[condition.index()].store(0, Ordering::Release);
    }

    // ── Lifecycle flags ───────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus {
            running: self.is_running(),
            paused: self.is_paused(),
            mode: self.mode(),
            iteration: self.iteration(),
            last_version_seen: self.last_version_seen(),
            last_version_at_action: self.last_version_at_action(),
            invalid_snapshot_attempts: self.attempts(WaitCondition::InvalidSnapshot),
            stale_snapshot_attempts: self.attempts(WaitCondition::StaleSnapshot),
            same_snapshot_attempts: self.attempts(WaitCondition::SameSnapshot),
        }
    }
}

/// Point-in-time copy of [`AgentState`] for the status file.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub running: bool,
    pub paused: bool,
    pub mode: AgentMode,
    pub iteration: u64,
    pub last_version_seen: i64,
    pub last_version_at_action: i64,
    pub invalid_snapshot_attempts: u32,
    pub stale_snapshot_attempts: u32,
    pub same_snapshot_attempts: u32,
}
