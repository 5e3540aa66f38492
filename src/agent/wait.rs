use std::future::Future;
use std::sync::Arc;

use super::state::{AgentState, WaitCondition};
use crate::config::WaitBudgetConfig;
use crate::snapshot::ProbeMode;

/// What the caller does when a wait runs out of budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ForcedProgress {
    /// Continue with whatever the last probe returned.
    ProceedWithLatest,
    /// Give up on this iteration and move to the next one.
    SkipIteration,
}

/// Whether a shrunk budget applies once a newer version is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehindRule {
    Ignore,
    ShrinkWhenBehind,
}

/// Result of a single probe.
#[derive(Debug)]
pub enum Probe<T> {
    Ready(T),
    NotYet(Option<T>),
}

#[derive(Debug)]
pub enum WaitOutcome<T> {
    Ready(T),
    Forced {
        action: ForcedProgress,
        last: Option<T>,
    },
}

/// Bounded retry around one [`WaitCondition`].
///
/// Each failed probe bumps the condition's counter in [`AgentState`] and
/// sleeps `poll_interval`. A failed probe seen with the counter already at
/// the budget resets the counter and yields [`WaitOutcome::Forced`], so the
/// wait never lasts longer than `max_attempts * poll_interval` plus probe
/// time.
#[derive(Debug, Clone)]
pub struct BoundedWaitPolicy {
    condition: WaitCondition,
    budget: WaitBudgetConfig,
    behind: BehindRule,
    forced: ForcedProgress,
    state: Arc<AgentState>,
}

impl BoundedWaitPolicy {
    pub fn new(
        condition: WaitCondition,
        budget: WaitBudgetConfig,
        behind: BehindRule,
        forced: ForcedProgress,
        state: Arc<AgentState>,
    ) -> Self {
        Self {
            condition,
            budget,
            behind,
            forced,
            state,
        }
    }

    pub fn condition(&self) -> WaitCondition {
        self.condition
    }

    pub fn is_behind(&self) -> bool {
        self.behind == BehindRule::ShrinkWhenBehind && self.state.is_behind()
    }

    /// Attempts allowed right now.
    pub fn max_attempts(&self, behind: bool) -> u32 {
        if behind {
            (self.budget.max_attempts / self.budget.behind_divisor.max(1)).max(1)
        } else {
            self.budget.max_attempts.max(1)
        }
    }

    /// Attempt at which a behind agent bypasses the cache once.
    pub fn refetch_attempt(&self, max_attempts: u32) -> u32 {
        let at = (f64::from(max_attempts) * self.budget.behind_refetch_fraction).ceil();
        // `at` is within [0, max_attempts] for a validated fraction
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let at = at as u32;
        at.clamp(1, max_attempts)
    }

    /// Probe until `probe` reports [`Probe::Ready`] or the budget runs out.
    pub async fn run<T, P, Fut>(&self, mut probe: P) -> WaitOutcome<T>
    where
        P: FnMut(ProbeMode) -> Fut,
        Fut: Future<Output = Probe<T>>,
    {
        loop {
            let behind = self.is_behind();
            let max_attempts = self.max_attempts(behind);
            let attempts = self.state.attempts(self.condition);

            let mode = if behind && attempts == self.refetch_attempt(max_attempts) {
                tracing::debug!(
                    condition = %self.condition,
                    attempts,
                    "Behind; refetching snapshot directly"
                );
                ProbeMode::Fresh
            } else {
                ProbeMode::Cached
            };

            let last = match probe(mode).await {
                Probe::Ready(value) => {
                    self.state.reset_attempts(self.condition);
                    return WaitOutcome::Ready(value);
                }
                Probe::NotYet(last) => last,
            };

            if attempts >= max_attempts {
                self.state.reset_attempts(self.condition);
                tracing::warn!(
                    condition = %self.condition,
                    attempts,
                    behind,
                    action = %self.forced,
                    "Wait budget exhausted; forcing progress"
                );
                return WaitOutcome::Forced {
                    action: self.forced,
                    last,
                };
            }

            let attempt = self.state.bump_attempt(self.condition);
            tracing::debug!(
                condition = %self.condition,
                attempt,
                max_attempts,
                "Waiting for snapshot"
            );
            tokio::time::sleep(self.budget.poll_interval()).await;
        }
    }
}
