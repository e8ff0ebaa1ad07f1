use anyhow::{Context, Result};
use failsight_backends::{BackendConfig, BackendSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration: one `[backends.<name>]` section per backend.
///
/// Environment variables override the file: GEMINI_API_KEY,
/// CLAUDE_API_KEY and RPC_ANALYSIS_URL always win when set, so a config
/// file never needs to hold credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backends: BackendSettings,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("could not determine user config directory")?;
        Ok(base.join("failsight").join("config.toml"))
    }

    fn entry(&mut self, name: &str) -> &mut BackendConfig {
        self.backends.entry(name.to_string()).or_default()
    }

    /// Overlay environment variables onto the file-based settings.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GEMINI_API_KEY")
            && !key.is_empty()
        {
            self.entry("gemini").api_key = Some(key);
        }
        if let Ok(key) = std::env::var("CLAUDE_API_KEY")
            && !key.is_empty()
        {
            self.entry("claude").api_key = Some(key);
        }
        if let Ok(url) = std::env::var("RPC_ANALYSIS_URL")
            && !url.is_empty()
        {
            self.entry("rpc").endpoint = Some(url);
        }
    }
}
