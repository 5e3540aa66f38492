use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Fallback identity used until the canvas assigns a user id.
    #[serde(default)]
    pub agent_id: Option<String>,

    #[serde(default)]
    pub observation: ObservationConfig,

    #[serde(default)]
    pub canvas: CanvasConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub poller: PollerConfig,

    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    #[serde(default)]
    pub submitter: SubmitterConfig,

    #[serde(default)]
    pub brain: BrainConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home =
            UserDirs::new().map_or_else(|| PathBuf::from("."), |u| u.home_dir().to_path_buf());

        Self {
            config_path: home.join(".poietic-agent").join("config.toml"),
            agent_id: None,
            observation: ObservationConfig::default(),
            canvas: CanvasConfig::default(),
            scheduler: SchedulerConfig::default(),
            poller: PollerConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            submitter: SubmitterConfig::default(),
            brain: BrainConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

// ── Observation Service ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationConfig {
    #[serde(default = "default_observation_url")]
    pub base_url: String,
    #[serde(default = "default_latest_path")]
    pub latest_path: String,
    #[serde(default = "default_action_path")]
    pub action_path: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_observation_url() -> String {
    "http://localhost:8006/q".into()
}

fn default_latest_path() -> String {
    "/latest".into()
}

fn default_action_path() -> String {
    "/action".into()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for ObservationConfig {
    fn default() -> Self {
        Self {
            base_url: default_observation_url(),
            latest_path: default_latest_path(),
            action_path: default_action_path(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

// ── Canvas Channel ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasConfig {
    #[serde(default = "default_canvas_url")]
    pub url: String,
    #[serde(default = "default_reconnect_initial_backoff_secs")]
    pub reconnect_initial_backoff_secs: u64,
    #[serde(default = "default_reconnect_max_backoff_secs")]
    pub reconnect_max_backoff_secs: u64,
}

fn default_canvas_url() -> String {
    "ws://localhost:3001/updates".into()
}

fn default_reconnect_initial_backoff_secs() -> u64 {
    1
}

fn default_reconnect_max_backoff_secs() -> u64 {
    30
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            url: default_canvas_url(),
            reconnect_initial_backoff_secs: default_reconnect_initial_backoff_secs(),
            reconnect_max_backoff_secs: default_reconnect_max_backoff_secs(),
        }
    }
}

// ── Scheduler ────────────────────────────────────────────────────────────────

/// Budget for one bounded wait. `behind_divisor` shrinks `max_attempts`
/// once the agent knows a newer version exists; `behind_refetch_fraction`
/// places the single direct refetch inside that shrunk budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaitBudgetConfig {
    pub max_attempts: u32,
    pub poll_interval_ms: u64,
    #[serde(default = "default_behind_divisor")]
    pub behind_divisor: u32,
    #[serde(default = "default_behind_refetch_fraction")]
    pub behind_refetch_fraction: f64,
}

impl WaitBudgetConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_behind_divisor() -> u32 {
    5
}

fn default_behind_refetch_fraction() -> f64 {
    0.5
}

fn default_invalid_wait() -> WaitBudgetConfig {
    WaitBudgetConfig {
        max_attempts: 30,
        poll_interval_ms: 2_000,
        behind_divisor: default_behind_divisor(),
        behind_refetch_fraction: default_behind_refetch_fraction(),
    }
}

fn default_version_wait() -> WaitBudgetConfig {
    WaitBudgetConfig {
        max_attempts: 20,
        poll_interval_ms: 3_000,
        behind_divisor: default_behind_divisor(),
        behind_refetch_fraction: default_behind_refetch_fraction(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_iteration_interval_secs")]
    pub iteration_interval_secs: u64,
    #[serde(default = "default_startup_jitter_ms")]
    pub startup_jitter_ms: u64,
    #[serde(default = "default_brain_timeout_secs")]
    pub brain_timeout_secs: u64,
    #[serde(default = "default_pause_poll_ms")]
    pub pause_poll_ms: u64,
    #[serde(default = "default_invalid_wait")]
    pub invalid_wait: WaitBudgetConfig,
    #[serde(default = "default_version_wait")]
    pub stale_wait: WaitBudgetConfig,
    #[serde(default = "default_version_wait")]
    pub same_wait: WaitBudgetConfig,
}

fn default_iteration_interval_secs() -> u64 {
    30
}

fn default_startup_jitter_ms() -> u64 {
    3_000
}

fn default_brain_timeout_secs() -> u64 {
    120
}

fn default_pause_poll_ms() -> u64 {
    500
}

impl SchedulerConfig {
    pub fn iteration_interval(&self) -> Duration {
        Duration::from_secs(self.iteration_interval_secs)
    }

    pub fn brain_timeout(&self) -> Duration {
        Duration::from_secs(self.brain_timeout_secs.max(1))
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            iteration_interval_secs: default_iteration_interval_secs(),
            startup_jitter_ms: default_startup_jitter_ms(),
            brain_timeout_secs: default_brain_timeout_secs(),
            pause_poll_ms: default_pause_poll_ms(),
            invalid_wait: default_invalid_wait(),
            stale_wait: default_version_wait(),
            same_wait: default_version_wait(),
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    #[serde(default = "default_poller_interval_secs")]
    pub interval_secs: u64,
}

fn default_poller_interval_secs() -> u64 {
    5
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poller_interval_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_heartbeat_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_channel_keepalive_secs")]
    pub channel_keepalive_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_heartbeat_interval_secs() -> u64 {
    30
}

fn default_channel_keepalive_secs() -> u64 {
    15
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_heartbeat_interval_secs(),
            channel_keepalive_secs: default_channel_keepalive_secs(),
        }
    }
}

// ── Action submission ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitterConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_send_retries")]
    pub max_send_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_empty_fallback_threshold")]
    pub empty_fallback_threshold: u32,
    #[serde(default = "default_fallback_palette")]
    pub fallback_palette: Vec<String>,
}

fn default_batch_size() -> usize {
    50
}

fn default_max_send_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    100
}

fn default_empty_fallback_threshold() -> u32 {
    3
}

fn default_fallback_palette() -> Vec<String> {
    vec![
        "#F5D142".into(),
        "#808080".into(),
        "#4A90D9".into(),
        "#D94A4A".into(),
    ]
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_send_retries: default_max_send_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            empty_fallback_threshold: default_empty_fallback_threshold(),
            fallback_palette: default_fallback_palette(),
        }
    }
}

// ── Brain ────────────────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BrainKind {
    #[default]
    Pattern,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    #[serde(default)]
    pub kind: BrainKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_brain_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_brain_retries")]
    pub max_retries: u32,
    #[serde(default = "default_brain_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_brain_request_timeout_secs() -> u64 {
    90
}

fn default_brain_retries() -> u32 {
    2
}

fn default_brain_backoff_ms() -> u64 {
    500
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            kind: BrainKind::default(),
            endpoint: None,
            timeout_secs: default_brain_request_timeout_secs(),
            max_retries: default_brain_retries(),
            backoff_ms: default_brain_backoff_ms(),
        }
    }
}

// ── Observability ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "none" | "log"
    #[serde(default = "default_observability_backend")]
    pub backend: String,
}

fn default_observability_backend() -> String {
    "log".into()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            backend: default_observability_backend(),
        }
    }
}
