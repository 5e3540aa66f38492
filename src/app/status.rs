use serde_json::Value;

use crate::config::Config;
use crate::platform::daemon::{WrittenStatus, read_state_file, state_file_path};

pub fn render_status(config: &Config) -> String {
    let path = state_file_path(config);
    let mut lines = vec![
        format!("◆ {}", t!("status.title")),
        String::new(),
        format!("{}     {}", t!("status.version"), env!("CARGO_PKG_VERSION")),
        format!("{}      {}", t!("status.config"), config.config_path.display()),
        format!("{}       {}", t!("status.brain"), config.brain.kind),
        format!("{}      {}", t!("status.canvas"), config.canvas.url),
        String::new(),
    ];

    match read_state_file(&path) {
        Ok(status) => lines.extend(render_written(&status)),
        Err(e) => lines.push(format!("  {e}")),
    }
    lines.join("\n")
}

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".into(),
    }
}

fn render_written(status: &WrittenStatus) -> Vec<String> {
    let agent = &status.agent;
    let mut lines = vec![
        format!("  {}   {}", t!("status.agent_id"), status.agent_id),
        format!("  {}  {}", t!("status.written_at"), status.written_at),
        format!(
            "  {}     {}",
            t!("status.healthy"),
            match status.healthy {
                Some(true) => t!("status.healthy_yes"),
                Some(false) => t!("status.healthy_no"),
                None => "-".into(),
            }
        ),
        format!(
            "  {}    running={} paused={} mode={}",
            t!("status.state"),
            field(agent, "running"),
            field(agent, "paused"),
            field(agent, "mode"),
        ),
        format!("  {}  {}", t!("status.iteration"), field(agent, "iteration")),
        format!(
            "  {}   seen={} acted={}",
            t!("status.versions"),
            field(agent, "last_version_seen"),
            field(agent, "last_version_at_action"),
        ),
        format!(
            "  {}      invalid={} stale={} same={}",
            t!("status.waits"),
            field(agent, "invalid_snapshot_attempts"),
            field(agent, "stale_snapshot_attempts"),
            field(agent, "same_snapshot_attempts"),
        ),
        String::new(),
        format!("  {}", t!("status.components")),
    ];

    if let Some(components) = status.health.get("components").and_then(Value::as_object) {
        for (name, component) in components {
            let mut line = format!(
                "    {name:<10} {} (restarts: {})",
                field(component, "status"),
                field(component, "restart_count")
            );
            if let Some(error) = component.get("last_error").and_then(Value::as_str) {
                line.push_str(&format!(" - {error}"));
            }
            lines.push(line);
        }
    }
    lines
}
