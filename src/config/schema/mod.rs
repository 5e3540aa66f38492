mod env_overrides;
mod loader;
#[cfg(test)]
mod test_env;
mod types;
mod validate;

pub use types::{
    BrainConfig, BrainKind, CanvasConfig, Config, HeartbeatConfig, ObservabilityConfig,
    ObservationConfig, PollerConfig, SchedulerConfig, SubmitterConfig, WaitBudgetConfig,
};
