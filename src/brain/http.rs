use serde::Deserialize;
use serde_json::{Value, json};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{Action, AgentMode, Brain, ContextBundle};
use crate::canvas::parse_pixels;
use crate::config::BrainConfig;
use crate::error::BrainError;

/// Brain served over HTTP: `POST {mode, context}` and an action back.
pub struct HttpBrain {
    client: reqwest::Client,
    endpoint: String,
    timeout_secs: u64,
    max_retries: u32,
    base_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct BrainReply {
    #[serde(default)]
    strategy_id: Option<String>,
    #[serde(default)]
    strategy_ids: Vec<String>,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    pixels: Option<Vec<String>>,
    #[serde(default)]
    predictions: Value,
    #[serde(default)]
    delta_complexity: Option<Value>,
}

impl HttpBrain {
    pub fn new(endpoint: &str, config: &BrainConfig) -> anyhow::Result<Self> {
        let timeout_secs = config.timeout_secs.max(1);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            timeout_secs,
            max_retries: config.max_retries,
            base_backoff_ms: config.backoff_ms.max(50),
        })
    }

    async fn call_once(&self, body: &Value) -> Result<Action, BrainError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BrainError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    BrainError::Request(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(BrainError::Status(status.as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| BrainError::Request(e.to_string()))?;
        let reply: BrainReply =
            serde_json::from_str(&text).map_err(|e| BrainError::Malformed(e.to_string()))?;
        into_action(reply)
    }
}

fn into_action(reply: BrainReply) -> Result<Action, BrainError> {
    let raw = reply
        .pixels
        .ok_or_else(|| BrainError::Malformed("reply has no pixels field".into()))?;
    let (mutations, skipped) = parse_pixels(&raw);
    if skipped > 0 {
        tracing::warn!(skipped, kept = mutations.len(), "Dropped malformed brain pixels");
    }

    let strategy_id = reply.strategy_id.or_else(|| {
        (!reply.strategy_ids.is_empty()).then(|| reply.strategy_ids.join("+"))
    });

    Ok(Action {
        strategy_id,
        strategy: reply.strategy,
        rationale: reply.rationale,
        mutations,
        predictions: reply.predictions,
        delta_complexity: reply.delta_complexity,
    })
}

impl Brain for HttpBrain {
    fn name(&self) -> &str {
        "http"
    }

    fn decide<'a>(
        &'a self,
        mode: AgentMode,
        context: &'a ContextBundle,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Action>> + Send + 'a>> {
        Box::pin(async move {
            let body = json!({ "mode": mode, "context": context });
            let mut backoff_ms = self.base_backoff_ms;

            for attempt in 0..=self.max_retries {
                match self.call_once(&body).await {
                    Ok(action) => {
                        if attempt > 0 {
                            tracing::info!(attempt, "Brain recovered after retries");
                        }
                        return Ok(action);
                    }
                    Err(e) if e.is_retryable() && attempt < self.max_retries => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            backoff_ms,
                            "Brain call failed, retrying: {e}"
                        );
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        backoff_ms = backoff_ms.saturating_mul(2).min(10_000);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            Err(anyhow::anyhow!("brain retries exhausted"))
        })
    }
}
