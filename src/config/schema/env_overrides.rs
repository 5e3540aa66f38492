use super::{BrainKind, Config};

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("POIETIC_AGENT_ID")
            && !id.is_empty()
        {
            self.agent_id = Some(id);
        }

        if let Ok(url) = std::env::var("POIETIC_OBSERVATION_URL")
            && !url.is_empty()
        {
            self.observation.base_url = url;
        }

        if let Ok(url) = std::env::var("POIETIC_CANVAS_URL")
            && !url.is_empty()
        {
            self.canvas.url = url;
        }

        if let Ok(endpoint) = std::env::var("POIETIC_BRAIN_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.brain.endpoint = Some(endpoint);
        }

        if let Ok(kind) = std::env::var("POIETIC_BRAIN_KIND")
            && let Ok(kind) = kind.parse::<BrainKind>()
        {
            self.brain.kind = kind;
        }

        if let Ok(secs) = std::env::var("POIETIC_INTERVAL_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.scheduler.iteration_interval_secs = secs;
        }
    }
}
