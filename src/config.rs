use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const SHEET_URL_VAR: &str = "DASHBOARD_SHEET_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Published CSV export of the enrollment sheet.
    pub sheet_url: Option<String>,
    pub fallback_path: PathBuf,
    pub refresh_minutes: u64,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sheet_url: None,
            fallback_path: PathBuf::from("data.json"),
            refresh_minutes: 15,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, otherwise starts from defaults. The sheet URL
    /// from the environment wins over the file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            info!(path = %path.display(), "loaded configuration");
            config
        } else {
            debug!(path = %path.display(), "no configuration file, using defaults");
            Config::default()
        };

        config.apply_env(std::env::var(SHEET_URL_VAR).ok());
        Ok(config)
    }

    fn apply_env(&mut self, sheet_url: Option<String>) {
        if let Some(url) = sheet_url.filter(|url| !url.trim().is_empty()) {
            self.sheet_url = Some(url);
        }
    }

    pub fn save_new(&self, path: &Path) -> anyhow::Result<()> {
        if path.exists() {
            bail!("{} already exists", path.display());
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
