use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::agent::{AgentState, AgentStatus};
use crate::config::Config;
use crate::diagnostics::health;

const STATE_FILE: &str = "agent_state.json";

#[derive(Debug, Clone, Serialize)]
struct StatusFile {
    agent_id: String,
    agent: AgentStatus,
    healthy: bool,
    health: serde_json::Value,
    written_at: String,
}

/// The fields `status` reads back. Everything else in the file is shown raw.
#[derive(Debug, Clone, Deserialize)]
pub struct WrittenStatus {
    pub agent_id: String,
    pub agent: serde_json::Value,
    #[serde(default)]
    pub healthy: Option<bool>,
    pub health: serde_json::Value,
    pub written_at: String,
}

pub fn state_file_path(config: &Config) -> PathBuf {
    config
        .config_path
        .parent()
        .map_or_else(|| PathBuf::from("."), PathBuf::from)
        .join(STATE_FILE)
}

pub fn read_state_file(path: &Path) -> Result<WrittenStatus> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("No status file at {}; is the agent running?", path.display()))?;
    serde_json::from_str(&raw).context("Status file is not valid JSON")
}

fn render(agent_id: &str, state: &AgentState) -> Vec<u8> {
    let status = StatusFile {
        agent_id: agent_id.to_string(),
        agent: state.status(),
        healthy: health::snapshot().is_healthy(),
        health: health::snapshot_json(),
        written_at: Utc::now().to_rfc3339(),
    };
    serde_json::to_vec_pretty(&status).unwrap_or_else(|_| b"{}".to_vec())
}

pub async fn write_state_file(path: &Path, agent_id: &str, state: &AgentState) -> std::io::Result<()> {
    // readers only ever see a complete file
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, render(agent_id, state)).await?;
    tokio::fs::rename(&tmp, path).await
}

pub fn spawn_state_writer(
    path: PathBuf,
    agent_id: String,
    state: Arc<AgentState>,
    flush_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Some(parent) = path.parent()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create state file directory");
        }

        let mut interval = tokio::time::interval(Duration::from_secs(flush_secs.max(1)));
        loop {
            interval.tick().await;
            if let Err(error) = write_state_file(&path, &agent_id, &state).await {
                tracing::warn!(%error, "failed to write agent state file");
            }
        }
    })
}
