use crate::{
    config::Config,
    error::{ConfigError, FetchError},
    model::{CityImage, CurrentConditions, RawForecastSample},
    source::{openweather::OpenWeatherSource, unsplash::UnsplashSource},
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;
pub mod unsplash;

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current(&self, place: &str) -> Result<CurrentConditions, FetchError>;
}

#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn forecast(&self, place: &str) -> Result<Vec<RawForecastSample>, FetchError>;
}

#[async_trait]
pub trait ImageSource: Send + Sync + Debug {
    /// Candidate pool; the caller picks the photos to show.
    async fn images(&self, place: &str) -> Result<Vec<CityImage>, FetchError>;
}

/// The three collaborators the search pipeline fetches from.
#[derive(Debug, Clone)]
pub struct Sources {
    pub weather: Arc<dyn WeatherSource>,
    pub forecast: Arc<dyn ForecastSource>,
    pub images: Arc<dyn ImageSource>,
}

impl Sources {
    /// Build the HTTP-backed sources, failing fast when a credential is missing.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let credentials = config.credentials()?;
        let timeout = config.request_timeout();

        let openweather = Arc::new(
            OpenWeatherSource::new(credentials.openweather, timeout)?
                .with_units(config.units)
                .with_forecast_samples(config.forecast_samples()),
        );
        let unsplash = Arc::new(
            UnsplashSource::new(credentials.unsplash, timeout)?
                .with_pool_size(config.image_pool_size),
        );

        Ok(Self {
            weather: openweather.clone(),
            forecast: openweather,
            images: unsplash,
        })
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
