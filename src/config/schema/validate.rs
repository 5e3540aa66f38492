use super::{BrainKind, Config, WaitBudgetConfig};
use crate::error::ConfigError;
use url::Url;

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_url("observation.base_url", &self.observation.base_url)?;
        let canvas = parse_url("canvas.url", &self.canvas.url)?;
        if !matches!(canvas.scheme(), "ws" | "wss") {
            return Err(ConfigError::Validation(format!(
                "canvas.url must use ws:// or wss://, got {}",
                canvas.scheme()
            )));
        }

        validate_wait("scheduler.invalid_wait", &self.scheduler.invalid_wait)?;
        validate_wait("scheduler.stale_wait", &self.scheduler.stale_wait)?;
        validate_wait("scheduler.same_wait", &self.scheduler.same_wait)?;

        if self.submitter.batch_size == 0 {
            return Err(ConfigError::Validation(
                "submitter.batch_size must be at least 1".into(),
            ));
        }
        if self.submitter.empty_fallback_threshold == 0 {
            return Err(ConfigError::Validation(
                "submitter.empty_fallback_threshold must be at least 1".into(),
            ));
        }
        if self.poller.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poller.interval_secs must be at least 1".into(),
            ));
        }
        if self.heartbeat.enabled && self.heartbeat.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "heartbeat.interval_secs must be at least 1".into(),
            ));
        }

        if self.brain.kind == BrainKind::Http {
            let endpoint = self.brain.endpoint.as_deref().ok_or_else(|| {
                ConfigError::Validation("brain.endpoint is required for kind = \"http\"".into())
            })?;
            parse_url("brain.endpoint", endpoint)?;
        }

        Ok(())
    }
}

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Validation(format!("{field}: {e} ({raw})")))
}

fn validate_wait(field: &str, budget: &WaitBudgetConfig) -> Result<(), ConfigError> {
    if budget.max_attempts == 0 {
        return Err(ConfigError::Validation(format!(
            "{field}.max_attempts must be at least 1"
        )));
    }
    if budget.behind_divisor == 0 {
        return Err(ConfigError::Validation(format!(
            "{field}.behind_divisor must be at least 1"
        )));
    }
    let fraction = budget.behind_refetch_fraction;
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "{field}.behind_refetch_fraction must be in (0, 1], got {fraction}"
        )));
    }
    Ok(())
}
