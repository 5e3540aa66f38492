use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{OnceLock, RwLock};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ComponentState {
    Starting,
    Ok,
    Error,
}

/// Last known condition of one background component (`scheduler`,
/// `poller`, `heartbeat`, `canvas`, `brain`).
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub updated_at: String,
    pub last_ok: Option<String>,
    pub last_error: Option<String>,
    pub restart_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub pid: u32,
    pub updated_at: String,
    pub uptime_seconds: u64,
    pub components: BTreeMap<String, ComponentHealth>,
}

impl HealthSnapshot {
    /// True when no component is currently in error.
    pub fn is_healthy(&self) -> bool {
        self.components
            .values()
            .all(|c| c.status != ComponentState::Error)
    }
}

struct Registry {
    started_at: Instant,
    components: RwLock<BTreeMap<String, ComponentHealth>>,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| Registry {
        started_at: Instant::now(),
        components: RwLock::new(BTreeMap::new()),
    })
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn update<F>(component: &str, apply: F)
where
    F: FnOnce(&mut ComponentHealth),
{
    let Ok(mut map) = registry().components.write() else {
        return;
    };
    let stamp = now();
    let entry = map
        .entry(component.to_string())
        .or_insert_with(|| ComponentHealth {
            status: ComponentState::Starting,
            updated_at: stamp.clone(),
            last_ok: None,
            last_error: None,
            restart_count: 0,
        });
    apply(entry);
    entry.updated_at = stamp;
}

pub fn mark_component_ok(component: &str) {
    update(component, |entry| {
        entry.status = ComponentState::Ok;
        entry.last_ok = Some(now());
        entry.last_error = None;
    });
}

#[allow(clippy::needless_pass_by_value)]
pub fn mark_component_error(component: &str, error: impl ToString) {
    let message = error.to_string();
    update(component, move |entry| {
        entry.status = ComponentState::Error;
        entry.last_error = Some(message);
    });
}

pub fn bump_component_restart(component: &str) {
    update(component, |entry| {
        entry.restart_count = entry.restart_count.saturating_add(1);
    });
}

pub fn component(name: &str) -> Option<ComponentHealth> {
    registry()
        .components
        .read()
        .ok()
        .and_then(|map| map.get(name).cloned())
}

pub fn snapshot() -> HealthSnapshot {
    let components = registry()
        .components
        .read()
        .map_or_else(|_| BTreeMap::new(), |map| map.clone());

    HealthSnapshot {
        pid: std::process::id(),
        updated_at: now(),
        uptime_seconds: registry().started_at.elapsed().as_secs(),
        components,
    }
}

pub fn snapshot_json() -> serde_json::Value {
    serde_json::to_value(snapshot()).unwrap_or_else(|_| {
        serde_json::json!({
            "status": "error",
            "message": "failed to serialize health snapshot"
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    // the registry is process-wide; keep names unique per test
    fn name(prefix: &str) -> String {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        format!("{prefix}-{}", NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[test]
    fn error_keeps_last_ok_and_ok_clears_error() {
        let poller = name("poller");
        mark_component_ok(&poller);
        mark_component_error(&poller, "connection refused");

        let state = component(&poller).unwrap();
        assert_eq!(state.status, ComponentState::Error);
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
        assert!(state.last_ok.is_some());

        mark_component_ok(&poller);
        let state = component(&poller).unwrap();
        assert_eq!(state.status, ComponentState::Ok);
        assert_eq!(state.last_error, None);
    }

    #[test]
    fn restarts_accumulate_without_changing_status() {
        let canvas = name("canvas");
        bump_component_restart(&canvas);
        bump_component_restart(&canvas);

        let state = component(&canvas).unwrap();
        assert_eq!(state.restart_count, 2);
        assert_eq!(state.status, ComponentState::Starting);
    }

    #[test]
    fn snapshot_json_uses_lowercase_status() {
        let brain = name("brain");
        mark_component_error(&brain, "timeout");

        let json = snapshot_json();
        let status = json["components"][&brain]["status"].as_str();
        assert_eq!(status, Some("error"));
        assert!(!snapshot().is_healthy());
    }
}
