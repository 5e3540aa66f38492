use std::sync::Arc;

use poietic_agent::agent::IterationOutcome;
use poietic_agent::config::{ObservationConfig, SchedulerConfig, WaitBudgetConfig};
use poietic_agent::transport::{HttpObservationApi, ObservationApi};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::scripted::{ScriptedBrain, agent};

fn api_for(server: &MockServer) -> Arc<dyn ObservationApi> {
    let config = ObservationConfig {
        base_url: format!("{}/q", server.uri()),
        ..ObservationConfig::default()
    };
    Arc::new(HttpObservationApi::new(&config).unwrap())
}

fn quick_waits() -> SchedulerConfig {
    let quick = WaitBudgetConfig {
        max_attempts: 10,
        poll_interval_ms: 20,
        behind_divisor: 5,
        behind_refetch_fraction: 0.5,
    };
    SchedulerConfig {
        startup_jitter_ms: 0,
        invalid_wait: quick,
        stale_wait: quick,
        same_wait: quick,
        ..SchedulerConfig::default()
    }
}

#[tokio::test]
async fn acts_on_the_first_ready_snapshot_and_reports_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/q/latest"))
        .and(query_param("agent_id", "agent-http"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 4,
            "_pending": true
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/q/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "version": 5,
            "_pending": false,
            "structures": [{"type": "spiral"}],
            "prediction_errors": {"agent-http": {"error": 0.25, "explanation": "close"}}
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/q/action"))
        .and(body_partial_json(json!({
            "agent_id": "agent-http",
            "iteration": 1,
            "is_heartbeat": false,
            "strategy_id": "scripted",
            "pixels": ["1,0#3366CC"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut runner = agent("agent-http", api_for(&server), ScriptedBrain::drawing(1), quick_waits());
    runner.state.advance_iteration();

    let outcome = runner.scheduler.run_iteration().await;

    assert!(matches!(outcome, IterationOutcome::Acted { version: Some(5), .. }));
    assert_eq!(runner.state.last_version_at_action(), 5);
    assert_eq!(runner.scheduler.memory().latest_error(), Some(0.25));
    server.verify().await;
}

#[tokio::test]
async fn unreachable_service_does_not_stop_the_loop() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/q/latest"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/q/action"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut runner = agent("agent-down", api_for(&server), ScriptedBrain::drawing(1), quick_waits());
    runner.state.advance_iteration();

    let outcome = runner.scheduler.run_iteration().await;

    // forced out of the invalid wait with nothing fetched; still acts
    assert!(matches!(outcome, IterationOutcome::Acted { version: None, .. }));
    assert_eq!(runner.state.iteration(), 2);
    assert_eq!(runner.brain.calls(), 1);
}
