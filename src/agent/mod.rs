pub mod heartbeat;
pub mod poller;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod submitter;
pub mod wait;

pub use heartbeat::{BeatOutcome, HeartbeatEmitter};
pub use poller::SnapshotPoller;
pub use runtime::AgentRuntime;
pub use scheduler::{AgentScheduler, ContextBundle, IterationOutcome, SchedulerDeps};
pub use state::{AgentMode, AgentState, AgentStatus, WaitCondition};
pub use submitter::{ActionSubmitter, SubmitReport};
pub use wait::{BehindRule, BoundedWaitPolicy, ForcedProgress, Probe, WaitOutcome};
