use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Largest page size the remote accepts.
pub const MAX_PER_PAGE: u32 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub anilist: AnilistConfig,

    pub harvest: HarvestConfig,

    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnilistConfig {
    pub endpoint: String,

    /// Base of the public entry pages used to derive `site_url`.
    pub site_base_url: String,

    /// ISO 3166-1 alpha-2 origin filter.
    pub country_of_origin: String,

    pub per_page: u32,

    /// Pause after every successful page (the remote allows ~2 req/s).
    pub page_delay_ms: u64,

    /// Pause before retrying a page after HTTP 429.
    pub rate_limit_wait_seconds: u64,

    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for AnilistConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://graphql.anilist.co".to_string(),
            site_base_url: "https://anilist.co".to_string(),
            country_of_origin: "KR".to_string(),
            per_page: MAX_PER_PAGE,
            page_delay_ms: 500,
            rate_limit_wait_seconds: 60,
            request_timeout_seconds: 30,
            user_agent: concat!("manhwa-harvest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl AnilistConfig {
    #[must_use]
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    #[must_use]
    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Only entries that started after this year are fetched.
    pub start_year: i32,

    /// Maximum number of new records per run.
    pub limit: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            start_year: 2010,
            limit: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,

    pub prefix: String,

    pub extension: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("enhanced_anilist_data"),
            prefix: "manhwa".to_string(),
            extension: "csv".to_string(),
        }
    }
}

impl Config {
    /// Loads from `explicit` if given, otherwise from the first config file found.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        for path in &Self::config_paths() {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::default_config_path()];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("manhwa-harvest").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".manhwa-harvest").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Returns `false` if the file already existed.
    pub fn create_default_if_missing(path: &Path) -> Result<bool> {
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(path)?;
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.anilist.endpoint)
            .with_context(|| format!("Invalid AniList endpoint: {}", self.anilist.endpoint))?;

        url::Url::parse(&self.anilist.site_base_url)
            .with_context(|| format!("Invalid site base URL: {}", self.anilist.site_base_url))?;

        if self.anilist.per_page == 0 || self.anilist.per_page > MAX_PER_PAGE {
            anyhow::bail!("per_page must be between 1 and {MAX_PER_PAGE}");
        }

        let country = &self.anilist.country_of_origin;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            anyhow::bail!("country_of_origin must be a two-letter country code, got '{country}'");
        }

        if self.harvest.limit == 0 {
            anyhow::bail!("Harvest limit must be > 0");
        }

        if self.output.prefix.is_empty() || self.output.extension.is_empty() {
            anyhow::bail!("Output prefix and extension cannot be empty");
        }

        Ok(())
    }
}
