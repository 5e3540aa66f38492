//! The decision-making collaborator.
//!
//! The scheduler only relies on the result-or-error contract of
//! [`Brain::decide`]; timeouts and retries for transient provider errors
//! belong to each implementation.

pub mod http;
pub mod pattern;

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub use crate::agent::scheduler::context::ContextBundle;
pub use crate::agent::state::AgentMode;
use crate::canvas::PixelMutation;
use crate::config::{BrainConfig, BrainKind};
pub use http::HttpBrain;
pub use pattern::PatternBrain;

/// One iteration's decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Action {
    pub strategy_id: Option<String>,
    pub strategy: Option<String>,
    pub rationale: Option<String>,
    pub mutations: Vec<PixelMutation>,
    pub predictions: Value,
    pub delta_complexity: Option<Value>,
}

impl Action {
    /// Stand-in for a failed decision.
    pub fn empty(rationale: impl Into<String>) -> Self {
        Self {
            rationale: Some(rationale.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Mutations in `"x,y#RRGGBB"` form.
    pub fn pixels(&self) -> Vec<String> {
        self.mutations.iter().map(ToString::to_string).collect()
    }
}

pub trait Brain: Send + Sync {
    fn name(&self) -> &str;

    fn decide<'a>(
        &'a self,
        mode: AgentMode,
        context: &'a ContextBundle,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Action>> + Send + 'a>>;
}

pub fn create_brain(config: &BrainConfig) -> anyhow::Result<Arc<dyn Brain>> {
    match config.kind {
        BrainKind::Pattern => Ok(Arc::new(PatternBrain::new())),
        BrainKind::Http => {
            let endpoint = config
                .endpoint
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("brain.endpoint is required for the http brain"))?;
            Ok(Arc::new(HttpBrain::new(endpoint, config)?))
        }
    }
}
