use crate::core::engine::{CurrencyChangePolicy, DEFAULT_CRYPTO, DEFAULT_DEBOUNCE};
use crate::core::feed::DEFAULT_FEED_INTERVAL;
use crate::core::token::FiatCode;
use crate::providers::coingecko::DEFAULT_BASE_URL;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// Environment variable overriding `providers.coingecko.api_key`.
pub const API_KEY_ENV: &str = "COINGECKO_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for CoinGeckoProviderConfig {
    fn default() -> Self {
        CoinGeckoProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub coingecko: Option<CoinGeckoProviderConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConverterConfig {
    #[serde(default = "default_crypto")]
    pub crypto: String,
    #[serde(default)]
    pub fiat: FiatCode,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub on_currency_change: CurrencyChangePolicy,
    /// Resolve unknown symbols to their lower-cased form instead of failing.
    #[serde(default)]
    pub lenient_token_ids: bool,
}

fn default_crypto() -> String {
    DEFAULT_CRYPTO.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            crypto: default_crypto(),
            fiat: FiatCode::default(),
            debounce_ms: default_debounce_ms(),
            on_currency_change: CurrencyChangePolicy::default(),
            lenient_token_ids: false,
        }
    }
}

impl ConverterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_FEED_INTERVAL.as_secs()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

impl FeedConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the default config file, or built-in defaults if it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "coinverter", "coinverter")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "coinverter", "coinverter")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn coingecko(&self) -> CoinGeckoProviderConfig {
        self.providers.coingecko.clone().unwrap_or_default()
    }

    /// API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        Self::resolve_api_key(std::env::var(API_KEY_ENV).ok(), self.coingecko().api_key)
    }

    fn resolve_api_key(env: Option<String>, configured: Option<String>) -> Option<String> {
        env.or(configured).filter(|key| !key.trim().is_empty())
    }
}
