use crate::core::batch::BatchOptions;
use crate::core::normalize::PercentScale;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Yahoo,
    Snapshots,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SnapshotsProviderConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_primary")]
    pub primary: ProviderKind,
    #[serde(default)]
    pub secondary: Option<ProviderKind>,
    pub yahoo: Option<YahooProviderConfig>,
    pub snapshots: Option<SnapshotsProviderConfig>,
}

fn default_primary() -> ProviderKind {
    ProviderKind::Yahoo
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            primary: ProviderKind::Yahoo,
            secondary: None,
            yahoo: Some(YahooProviderConfig {
                base_url: "https://query1.finance.yahoo.com".to_string(),
            }),
            snapshots: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BatchConfig {
    pub concurrency: usize,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            concurrency: 1,
            request_delay_ms: 500,
            timeout_secs: 30,
        }
    }
}

impl From<&BatchConfig> for BatchOptions {
    fn from(config: &BatchConfig) -> Self {
        BatchOptions {
            concurrency: config.concurrency.max(1),
            request_delay: Duration::from_millis(config.request_delay_ms),
            request_timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

fn default_exchange_suffix() -> String {
    ".SA".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub assets: Vec<String>,
    #[serde(default = "default_exchange_suffix")]
    pub exchange_suffix: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub normalization: PercentScale,
    pub output_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("br", "assetdigest", "assetdigest")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn output_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.output_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("br", "assetdigest", "assetdigest")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("investments.json"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
