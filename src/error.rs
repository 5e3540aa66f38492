use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the agent.
///
/// Each collaborator defines its own variant. The scheduling loop never
/// propagates these; it matches on them to decide whether to retry, count a
/// drop, or substitute an empty action. Application code at the edges keeps
/// using `anyhow::Result` for context chains.
#[derive(Debug, Error)]
pub enum AgentError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Observation Service ─────────────────────────────────────────────
    #[error("observation: {0}")]
    Observation(#[from] ObservationError),

    // ── Canvas Channel ──────────────────────────────────────────────────
    #[error("channel: {0}")]
    Channel(#[from] ChannelError),

    // ── Brain collaborator ──────────────────────────────────────────────
    #[error("brain: {0}")]
    Brain(#[from] BrainError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Observation Service errors ─────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("decode failed: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ObservationError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return Self::Status(status.as_u16());
        }
        if err.is_decode() {
            return Self::Decode(err.to_string());
        }
        Self::Request(err.to_string())
    }
}

// ─── Canvas Channel errors ──────────────────────────────────────────────────

/// Failures writing to the shared canvas connection. All of them are
/// transient from the submitter's point of view: a send is retried a bounded
/// number of times and then dropped.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("canvas channel is not connected")]
    NotConnected,

    #[error("send failed: {0}")]
    Send(String),

    #[error("canvas channel closed")]
    Closed,
}

// ─── Brain errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BrainError {
    #[error("brain call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("malformed brain output: {0}")]
    Malformed(String),

    #[error("brain request failed: {0}")]
    Request(String),

    #[error("brain endpoint returned status {0}")]
    Status(u16),
}

impl BrainError {
    /// Worth another attempt: connection trouble, timeouts, 5xx, 408, 429.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Request(_) => true,
            Self::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            Self::Malformed(_) => false,
        }
    }
}

// ─── Convenience alias ──────────────────────────────────────────────────────

pub type Result<T, E = AgentError> = std::result::Result<T, E>;
