use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::app::status::render_status;
use crate::cli::{Cli, Commands};
use crate::config::Config;

/// Seed plus one action iteration.
const ONCE_ITERATIONS: u64 = 2;

pub async fn dispatch(cli: Cli, mut config: Config) -> Result<()> {
    match cli.command {
        Commands::Run {
            agent_id,
            brain,
            once,
        } => {
            if let Some(agent_id) = agent_id {
                config.agent_id = Some(agent_id);
            }
            if let Some(kind) = brain {
                config.brain.kind = kind;
            }
            config.validate()?;

            info!(
                brain = %config.brain.kind,
                canvas = %config.canvas.url,
                observation = %config.observation.base_url,
                "Starting agent"
            );
            let max_iterations = once.then_some(ONCE_ITERATIONS);
            crate::platform::daemon::run(Arc::new(config), max_iterations).await
        }

        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}
