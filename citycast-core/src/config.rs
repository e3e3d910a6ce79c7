use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use crate::error::ConfigError;

/// Upper bound on forecast samples kept for the charts.
pub const MAX_FORECAST_SAMPLES: usize = 24;

/// External services the dashboard talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    OpenWeather,
    Unsplash,
}

impl ServiceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceId::OpenWeather => "openweather",
            ServiceId::Unsplash => "unsplash",
        }
    }

    /// Environment variable that overrides the key stored on disk.
    pub fn env_var(&self) -> &'static str {
        match self {
            ServiceId::OpenWeather => "OPENWEATHER_API_KEY",
            ServiceId::Unsplash => "UNSPLASH_ACCESS_KEY",
        }
    }

    pub const fn all() -> &'static [ServiceId] {
        &[ServiceId::OpenWeather, ServiceId::Unsplash]
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ServiceId {
    type Error = ConfigError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_lowercase().as_str() {
            "openweather" => Ok(ServiceId::OpenWeather),
            "unsplash" => Ok(ServiceId::Unsplash),
            _ => Err(ConfigError::UnknownService(value.to_string())),
        }
    }
}

/// Unit system requested from the weather source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
            Units::Standard => "K",
        }
    }

    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            Units::Metric | Units::Standard => "m/s",
        }
    }
}

/// Credentials for a single service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub api_key: String,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// City searched when the dashboard starts without an explicit place.
    pub default_city: Option<String>,

    pub units: Units,

    pub forecast_samples: usize,

    /// How many candidate photos to request before sampling.
    pub image_pool_size: usize,

    /// How many photos end up on the dashboard.
    pub image_count: usize,

    pub request_timeout_secs: u64,

    /// Example TOML:
    /// [services.openweather]
    /// api_key = "..."
    pub services: HashMap<String, ServiceConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_city: None,
            units: Units::default(),
            forecast_samples: MAX_FORECAST_SAMPLES,
            image_pool_size: 20,
            image_count: 4,
            request_timeout_secs: 10,
            services: HashMap::new(),
        }
    }
}

/// Validated pair of API keys, produced by [`Config::credentials`].
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openweather: String,
    pub unsplash: String,
}

impl Config {
    /// Load config from disk, or return the defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "citycast", "citycast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Set or replace the API key of a service.
    pub fn upsert_api_key(&mut self, id: ServiceId, api_key: String) {
        self.services.insert(id.as_str().to_string(), ServiceConfig { api_key });
    }

    /// Returns the API key for a service, if present and non-blank.
    pub fn api_key(&self, id: ServiceId) -> Option<&str> {
        self.services
            .get(id.as_str())
            .map(|cfg| cfg.api_key.trim())
            .filter(|key| !key.is_empty())
    }

    pub fn is_service_configured(&self, id: ServiceId) -> bool {
        self.api_key(id).is_some()
    }

    /// Apply `OPENWEATHER_API_KEY` / `UNSPLASH_ACCESS_KEY` from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_with(|name| std::env::var(name).ok());
    }

    /// Same as [`Config::apply_env_overrides`], with an explicit variable lookup.
    pub fn apply_overrides_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for id in ServiceId::all() {
            if let Some(key) = lookup(id.env_var()).filter(|k| !k.trim().is_empty()) {
                self.upsert_api_key(*id, key);
            }
        }
    }

    /// Both keys or a diagnostic naming every missing one.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        let missing: Vec<ServiceId> = ServiceId::all()
            .iter()
            .copied()
            .filter(|id| !self.is_service_configured(*id))
            .collect();

        match (self.api_key(ServiceId::OpenWeather), self.api_key(ServiceId::Unsplash)) {
            (Some(openweather), Some(unsplash)) => Ok(Credentials {
                openweather: openweather.to_string(),
                unsplash: unsplash.to_string(),
            }),
            _ => Err(ConfigError::MissingCredentials(missing)),
        }
    }

    /// Forecast sample count, clamped to what the charts hold.
    pub fn forecast_samples(&self) -> usize {
        self.forecast_samples.clamp(1, MAX_FORECAST_SAMPLES)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Trimmed default city, if one is configured.
    pub fn default_city(&self) -> Option<&str> {
        self.default_city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}
