use anyhow::Result;
use std::sync::Arc;

use crate::agent::AgentRuntime;
use crate::config::Config;
use crate::diagnostics::health;

mod state;
mod supervisor;

pub use state::{WrittenStatus, read_state_file, state_file_path};
pub use supervisor::spawn_component_supervisor;

const STATUS_FLUSH_SECONDS: u64 = 5;

/// Run one agent until Ctrl-C, or until `max_iterations` have completed.
pub async fn run(config: Arc<Config>, max_iterations: Option<u64>) -> Result<()> {
    let mut runtime = AgentRuntime::new(Arc::clone(&config))?;
    let state_path = state_file_path(&config);
    let writer = state::spawn_state_writer(
        state_path.clone(),
        runtime.fallback_id().to_string(),
        runtime.state(),
        STATUS_FLUSH_SECONDS,
    );

    runtime.start();
    health::mark_component_ok("daemon");
    println!("◆ {}", t!("daemon.started", agent_id = runtime.fallback_id()));
    println!("   {}", t!("daemon.canvas", url = config.canvas.url.as_str()));
    println!("   {}", t!("daemon.observation", url = config.observation.base_url.as_str()));
    println!("   {}", t!("daemon.stop_hint"));

    let state = runtime.state();
    let cancel = runtime.cancel_token();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            state.set_running(false);
            cancel.cancel();
        }
    });

    runtime.run(max_iterations).await;
    runtime.stop().await;
    health::mark_component_error("daemon", "stopped");

    signal.abort();
    writer.abort();
    let _ = writer.await;
    if let Err(error) =
        state::write_state_file(&state_path, runtime.fallback_id(), &runtime.state()).await
    {
        tracing::warn!(%error, "failed to write final agent state");
    }
    Ok(())
}
