use anyhow::{Context, anyhow};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::{
    config::{MAX_FORECAST_SAMPLES, Units},
    error::FetchError,
    forecast::whole_degrees,
    model::{CurrentConditions, RawForecastSample},
};

use super::{ForecastSource, WeatherSource, truncate_body};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Current conditions and the 3-hourly forecast from OpenWeather.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    base_url: String,
    units: Units,
    forecast_samples: usize,
    http: Client,
}

impl OpenWeatherSource {
    pub fn new(api_key: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            units: Units::default(),
            forecast_samples: MAX_FORECAST_SAMPLES,
            http,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    pub fn with_forecast_samples(mut self, samples: usize) -> Self {
        self.forecast_samples = samples.clamp(1, MAX_FORECAST_SAMPLES);
        self
    }

    async fn get(&self, path: &str, place: &str, extra: &[(&str, String)], what: &str) -> Result<String, FetchError> {
        let url = format!("{}{}", self.base_url, path);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", place),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .query(extra)
            .send()
            .await
            .with_context(|| format!("Failed to send request to OpenWeather ({what})"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read OpenWeather {what} response body"))?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::not_found(place));
        }

        if !status.is_success() {
            return Err(anyhow!(
                "OpenWeather {what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            )
            .into());
        }

        Ok(body)
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn current(&self, place: &str) -> Result<CurrentConditions, FetchError> {
        let body = self.get("/data/2.5/weather", place, &[], "current weather").await?;
        parse_current(&body, place, self.units)
    }
}

#[async_trait]
impl ForecastSource for OpenWeatherSource {
    async fn forecast(&self, place: &str) -> Result<Vec<RawForecastSample>, FetchError> {
        let count = [("cnt", self.forecast_samples.to_string())];
        let body = self.get("/data/2.5/forecast", place, &count, "forecast").await?;
        parse_forecast(&body, place)
    }
}

/// Decode a `/weather` body. A `cod` of 404 means the place is unknown.
pub fn parse_current(body: &str, place: &str, units: Units) -> Result<CurrentConditions, FetchError> {
    let value = parse_envelope(body, place, "current weather")?;
    let parsed: OwCurrentResponse =
        serde_json::from_value(value).context("Failed to parse OpenWeather current JSON")?;

    let icon = parsed.weather.first().map(|w| w.icon.clone()).unwrap_or_default();

    Ok(CurrentConditions {
        location_name: parsed.name,
        temperature: whole_degrees(parsed.main.temp),
        humidity_pct: parsed.main.humidity,
        wind_speed: parsed.wind.speed,
        wind_direction_deg: parsed.wind.deg,
        icon,
        utc_offset_seconds: parsed.timezone,
        sunrise_epoch: parsed.sys.sunrise,
        sunset_epoch: parsed.sys.sunset,
        units,
    })
}

/// Decode a `/forecast` body into raw samples, in source order.
pub fn parse_forecast(body: &str, place: &str) -> Result<Vec<RawForecastSample>, FetchError> {
    let value = parse_envelope(body, place, "forecast")?;
    let parsed: OwForecastResponse =
        serde_json::from_value(value).context("Failed to parse OpenWeather forecast JSON")?;

    Ok(parsed
        .list
        .into_iter()
        .map(|entry| RawForecastSample {
            timestamp: entry.dt_txt,
            temperature: entry.main.temp,
            humidity_pct: entry.main.humidity,
            wind_speed: entry.wind.speed,
        })
        .collect())
}

fn parse_envelope(body: &str, place: &str, what: &str) -> Result<Value, FetchError> {
    let value: Value = serde_json::from_str(body)
        .with_context(|| format!("Failed to parse OpenWeather {what} JSON"))?;

    match value.get("cod").and_then(status_code) {
        Some(404) => Err(FetchError::not_found(place)),
        Some(code) if !(200..300).contains(&code) => {
            let message = value.get("message").and_then(Value::as_str).unwrap_or("no message");
            Err(anyhow!("OpenWeather {what} reported code {code}: {message}").into())
        }
        _ => Ok(value),
    }
}

/// OpenWeather sends `cod` as a number on `/weather` and a string on `/forecast`.
fn status_code(cod: &Value) -> Option<u64> {
    match cod {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    deg: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
    timezone: i32,
    sys: OwSys,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    wind: OwWind,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
}
