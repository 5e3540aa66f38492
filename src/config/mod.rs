pub mod schema;

pub use schema::{
    BrainConfig, BrainKind, CanvasConfig, Config, HeartbeatConfig, ObservabilityConfig,
    ObservationConfig, PollerConfig, SchedulerConfig, SubmitterConfig, WaitBudgetConfig,
};
