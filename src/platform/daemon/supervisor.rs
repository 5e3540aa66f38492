use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::diagnostics::health;

/// Keep `run_component` alive, restarting it with doubling backoff after
/// every exit until `cancel` fires. `max_restarts == 0` means no limit.
pub fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    cancel: CancellationToken,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let initial = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(initial);
        let mut backoff = initial;
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::debug!("Component '{name}' starting");
            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = run_component() => result,
            };
            if cancel.is_cancelled() {
                break;
            }

            match result {
                Ok(()) => {
                    tracing::warn!("Component '{name}' exited; restarting");
                    backoff = initial;
                }
                Err(e) => {
                    tracing::error!("Component '{name}' failed: {e:#}");
                    health::mark_component_error(name, &e);
                }
            }
            consecutive_failures = consecutive_failures.saturating_add(1);
            health::bump_component_restart(name);

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!("Component '{name}' exceeded {max_restarts} restarts; giving up");
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(Duration::from_secs(backoff)) => {}
            }
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
        tracing::debug!("Component '{name}' supervisor stopped");
    })
}
