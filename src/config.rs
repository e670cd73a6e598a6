use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::infra::matrix::DEFAULT_BASE_URL;

pub const DEFAULT_CONFIG_FILE: &str = "freight-quote.toml";
const ENV_PREFIX: &str = "FREIGHT_QUOTE";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub distance: DistanceSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DistanceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageSettings {
    /// Directory holding `store.json`; the platform data dir when unset.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LedgerSettings {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_page_size() -> usize {
    10
}

/// Load settings from an optional TOML file, then `FREIGHT_QUOTE__*` environment variables.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let settings = config::Config::builder()
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> anyhow::Result<()> {
    if settings.ledger.page_size == 0 {
        anyhow::bail!("ledger.page_size must be at least 1");
    }
    if settings.distance.timeout_secs == 0 {
        anyhow::bail!("distance.timeout_secs must be at least 1");
    }
    url::Url::parse(&settings.distance.base_url)
        .map_err(|e| anyhow::anyhow!("distance.base_url is invalid: {e}"))?;
    Ok(())
}
