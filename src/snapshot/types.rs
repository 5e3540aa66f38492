use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Version reported before anything has been observed.
pub const UNVERSIONED: i64 = -1;

/// Descriptions the Observation Service publishes in an empty scaffold.
const PLACEHOLDER_PREFIXES: &[&str] = &["waiting", "awaiting"];
const PLACEHOLDER_VALUES: &[&str] = &["n/a", "none", "pending"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionError {
    #[serde(default)]
    pub error: f64,
    #[serde(default)]
    pub explanation: String,
}

/// One versioned observation of the shared canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default = "unversioned")]
    pub version: i64,

    #[serde(rename = "_pending", alias = "pending", default)]
    pub pending: bool,

    #[serde(default)]
    pub structures: Vec<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<Value>,

    #[serde(default)]
    pub prediction_errors: HashMap<String, PredictionError>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplicity_assessment: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_rankings: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unversioned() -> i64 {
    UNVERSIONED
}

impl Snapshot {
    /// A bare snapshot carrying only a version, mostly for tests.
    pub fn scaffold(version: i64) -> Self {
        Self {
            version,
            pending: false,
            structures: Vec::new(),
            narrative: None,
            prediction_errors: HashMap::new(),
            simplicity_assessment: None,
            agent_rankings: None,
            extra: Map::new(),
        }
    }

    /// Ready for use: not pending, and carries either structures or a real
    /// description rather than the scaffold's placeholder text.
    pub fn is_valid(&self) -> bool {
        if self.pending {
            return false;
        }
        if !self.structures.is_empty() {
            return true;
        }
        self.descriptions().any(|text| !is_placeholder(text))
    }

    /// Description of the current complexity assessment, if any.
    pub fn description(&self) -> Option<&str> {
        self.simplicity_assessment
            .as_ref()?
            .get("C_d_current")?
            .get("description")?
            .as_str()
    }

    pub fn narrative_summary(&self) -> Option<&str> {
        self.narrative.as_ref()?.get("summary")?.as_str()
    }

    pub fn prediction_error_for(&self, agent_id: &str) -> Option<&PredictionError> {
        self.prediction_errors.get(agent_id)
    }

    fn descriptions(&self) -> impl Iterator<Item = &str> {
        self.description().into_iter().chain(self.narrative_summary())
    }
}

fn is_placeholder(text: &str) -> bool {
    let lowered = text.trim().to_ascii_lowercase();
    lowered.is_empty()
        || PLACEHOLDER_VALUES.contains(&lowered.as_str())
        || PLACEHOLDER_PREFIXES
            .iter()
            .any(|prefix| lowered.starts_with(prefix))
}
