use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        let agent_dir = home.join(".poietic-agent");

        if !agent_dir.exists() {
            fs::create_dir_all(&agent_dir).context("Failed to create .poietic-agent directory")?;
        }

        Self::load_from(&agent_dir.join("config.toml"))
    }

    /// Load `path`, writing a default file there first when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let fresh = Self::default();
            fresh.write_to(path)?;
            fresh
        };

        config.config_path = path.to_path_buf();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.write_to(&self.config_path)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_toml()?).context("Failed to write config file")?;
        Ok(())
    }
}
