use std::sync::Arc;
use std::time::Duration;

use poietic_agent::AgentRuntime;
use poietic_agent::brain::Brain;
use poietic_agent::config::Config;
use poietic_agent::diagnostics::health;
use poietic_agent::transport::ObservationApi;

use crate::scripted::{ScriptedBrain, TickingFeed};

#[allow(clippy::field_reassign_with_default)]
fn offline_config() -> Config {
    let mut config = Config::default();
    config.agent_id = Some("lifecycle".into());
    // nothing listens here; the canvas supervisor keeps retrying
    config.canvas.url = "ws://127.0.0.1:9/updates".into();
    config.scheduler.startup_jitter_ms = 0;
    config.scheduler.iteration_interval_secs = 0;
    config.heartbeat.enabled = false;
    config.submitter.max_send_retries = 0;
    config
}

#[tokio::test]
async fn once_run_seeds_acts_and_stops_cleanly() {
    let feed = Arc::new(TickingFeed::new(Duration::from_secs(3_600)));
    let brain = Arc::new(ScriptedBrain::drawing(3));
    let mut runtime = AgentRuntime::with_collaborators(
        Arc::new(offline_config()),
        Arc::clone(&feed) as Arc<dyn ObservationApi>,
        Arc::clone(&brain) as Arc<dyn Brain>,
    );
    let state = runtime.state();
    assert_eq!(runtime.fallback_id(), "lifecycle");

    runtime.start();
    assert!(state.is_running());

    tokio::time::timeout(Duration::from_secs(10), runtime.run(Some(2)))
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(10), runtime.stop())
        .await
        .unwrap();

    assert!(!state.is_running());
    assert_eq!(state.iteration(), 2);
    assert_eq!(state.last_version_at_action(), 1);
    assert_eq!(brain.acted_versions(), vec![1]);

    // the canvas never connected, so every cell was dropped, but both
    // decisions were still reported
    let reports = feed.reports.lock().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.pixels.len() == 3 && !r.is_heartbeat));
    assert!(health::component("scheduler").is_some());
}

#[tokio::test]
async fn cancelled_runtime_returns_before_the_first_iteration() {
    let mut config = offline_config();
    config.scheduler.startup_jitter_ms = 60_000;
    let brain = Arc::new(ScriptedBrain::drawing(1));
    let mut runtime = AgentRuntime::with_collaborators(
        Arc::new(config),
        Arc::new(TickingFeed::new(Duration::from_secs(10))),
        Arc::clone(&brain) as Arc<dyn Brain>,
    );

    runtime.start();
    let cancel = runtime.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    tokio::time::timeout(Duration::from_secs(5), runtime.run(None))
        .await
        .unwrap();
    runtime.stop().await;

    assert_eq!(brain.calls(), 0);
    assert_eq!(runtime.state().iteration(), 0);
}
