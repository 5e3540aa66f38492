use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

use crate::config::ObservationConfig;
use crate::error::ObservationError;
use crate::snapshot::Snapshot;

/// Body of `POST /action`, shared by real actions and heartbeats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionReport {
    pub agent_id: String,
    pub position: [i32; 2],
    pub iteration: u64,
    pub is_heartbeat: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub predictions: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_complexity: Option<Value>,
    pub pixels: Vec<String>,
    pub timestamp: String,
}

impl ActionReport {
    pub fn heartbeat(agent_id: impl Into<String>, position: (i32, i32), iteration: u64) -> Self {
        Self {
            agent_id: agent_id.into(),
            position: [position.0, position.1],
            iteration,
            is_heartbeat: true,
            strategy: None,
            strategy_id: None,
            rationale: None,
            predictions: Value::Null,
            delta_complexity: None,
            pixels: Vec::new(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// The versioned Observation Service.
pub trait ObservationApi: Send + Sync {
    /// Newest snapshot as seen by `agent_id`.
    fn latest<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Snapshot, ObservationError>> + Send + 'a>>;

    /// Publish an action or heartbeat.
    fn report<'a>(
        &'a self,
        report: &'a ActionReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), ObservationError>> + Send + 'a>>;
}

pub struct HttpObservationApi {
    client: reqwest::Client,
    latest_url: Url,
    action_url: Url,
}

impl HttpObservationApi {
    pub fn new(config: &ObservationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            client,
            latest_url: join(&config.base_url, &config.latest_path)?,
            action_url: join(&config.base_url, &config.action_path)?,
        })
    }
}

fn join(base: &str, path: &str) -> anyhow::Result<Url> {
    let raw = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&raw)?)
}

impl ObservationApi for HttpObservationApi {
    fn latest<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Snapshot, ObservationError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(self.latest_url.clone())
                .query(&[("agent_id", agent_id)])
                .send()
                .await?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ObservationError::Status(status.as_u16()));
            }

            let body = resp.text().await?;
            serde_json::from_str::<Snapshot>(&body)
                .map_err(|e| ObservationError::Decode(e.to_string()))
        })
    }

    fn report<'a>(
        &'a self,
        report: &'a ActionReport,
    ) -> Pin<Box<dyn Future<Output = Result<(), ObservationError>> + Send + 'a>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(self.action_url.clone())
                .json(report)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(ObservationError::Status(status.as_u16()))
            }
        })
    }
}
