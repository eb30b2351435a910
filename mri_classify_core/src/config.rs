use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::Level;

/// Settings read from the `--config` TOML file.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Weights file; defaults to the one next to the executable.
    pub weights: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl AppConfig {
    pub fn load<T: AsRef<Path>>(path: T) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("read config {} err:{}", path.display(), e))?;
        Self::from_toml(&text).map_err(|e| anyhow::anyhow!("config {}: {}", path.display(), e))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.level()?;
        Ok(config)
    }

    pub fn level(&self) -> Result<Option<Level>> {
        self.log_level
            .as_deref()
            .map(|l| {
                l.parse::<Level>()
                    .map_err(|_| anyhow::format_err!("unknown log_level `{}`", l))
            })
            .transpose()
    }
}
