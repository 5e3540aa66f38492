use std::sync::Arc;
use std::time::Duration;

use poietic_agent::config::SchedulerConfig;
use poietic_agent::transport::ObservationApi;
use tokio_util::sync::CancellationToken;

use crate::scripted::{ScriptedBrain, TickingFeed, agent};

fn every(secs: u64) -> SchedulerConfig {
    SchedulerConfig {
        iteration_interval_secs: secs,
        startup_jitter_ms: 0,
        ..SchedulerConfig::default()
    }
}

fn strictly_increasing(versions: &[i64]) -> bool {
    versions.windows(2).all(|w| w[1] > w[0])
}

#[tokio::test(start_paused = true)]
async fn agents_with_different_cadences_never_act_backwards() {
    let feed = Arc::new(TickingFeed::new(Duration::from_secs(10)));
    let api = Arc::clone(&feed) as Arc<dyn ObservationApi>;
    let mut fast = agent("fast", Arc::clone(&api), ScriptedBrain::drawing(2), every(5));
    let mut slow = agent("slow", api, ScriptedBrain::drawing(2), every(25));
    let cancel = CancellationToken::new();

    tokio::join!(
        fast.scheduler.run(&cancel, Some(8)),
        slow.scheduler.run(&cancel, Some(4)),
    );

    let fast_versions = fast.brain.acted_versions();
    let slow_versions = slow.brain.acted_versions();
    assert_eq!(fast_versions.len(), 7, "{fast_versions:?}");
    assert_eq!(slow_versions.len(), 3, "{slow_versions:?}");
    assert!(strictly_increasing(&fast_versions), "{fast_versions:?}");
    assert!(strictly_increasing(&slow_versions), "{slow_versions:?}");

    for state in [&fast.state, &slow.state] {
        assert!(state.last_version_at_action() <= state.last_version_seen());
        assert!(state.last_version_seen() <= feed.current_version());
    }
}

#[tokio::test(start_paused = true)]
async fn agents_share_a_version_without_blocking_each_other() {
    // one version for the whole test
    let feed = Arc::new(TickingFeed::new(Duration::from_secs(3_600)));
    let api = Arc::clone(&feed) as Arc<dyn ObservationApi>;
    let mut a = agent("a", Arc::clone(&api), ScriptedBrain::drawing(1), every(1));
    let mut b = agent("b", api, ScriptedBrain::drawing(1), every(1));
    let cancel = CancellationToken::new();

    tokio::join!(a.scheduler.run(&cancel, Some(2)), b.scheduler.run(&cancel, Some(2)));

    assert_eq!(a.brain.acted_versions(), vec![1]);
    assert_eq!(b.brain.acted_versions(), vec![1]);
    assert_eq!(a.state.last_version_at_action(), 1);
    assert_eq!(b.state.last_version_at_action(), 1);
}

#[tokio::test(start_paused = true)]
async fn silent_brain_still_paints_through_fallbacks() {
    let feed = Arc::new(TickingFeed::new(Duration::from_secs(10)));
    let mut quiet = agent(
        "quiet",
        Arc::clone(&feed) as Arc<dyn ObservationApi>,
        ScriptedBrain::drawing(0),
        every(30),
    );
    let cancel = CancellationToken::new();

    quiet.scheduler.run(&cancel, Some(4)).await;

    // seed fallback, then one more after three empty actions
    assert_eq!(quiet.channel.cell_updates(), 16);
    assert_eq!(feed.reports.lock().unwrap().len(), 2);
    assert_eq!(quiet.brain.calls(), 4);
}

#[tokio::test(start_paused = true)]
async fn stopped_agent_leaves_the_loop_between_iterations() {
    let feed = Arc::new(TickingFeed::new(Duration::from_secs(10)));
    let mut runner = agent(
        "runner",
        Arc::clone(&feed) as Arc<dyn ObservationApi>,
        ScriptedBrain::drawing(1),
        every(30),
    );
    let cancel = CancellationToken::new();

    let state = Arc::clone(&runner.state);
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(45)).await;
        state.set_running(false);
    });
    runner.scheduler.run(&cancel, None).await;
    stopper.await.unwrap();

    // seed at 0s, action at 30s, loop exits after the 60s wake-up
    assert_eq!(runner.state.iteration(), 2);
    assert_eq!(runner.brain.calls(), 2);
}
