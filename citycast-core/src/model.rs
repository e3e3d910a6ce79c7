use serde::{Deserialize, Serialize};

use crate::config::Units;

/// Current conditions for one place, as shown at the top of the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub location_name: String,
    /// Whole degrees, truncated toward zero.
    pub temperature: i32,
    pub humidity_pct: u8,
    pub wind_speed: f64,
    pub wind_direction_deg: Option<f64>,
    /// OpenWeather icon code, e.g. `01d`.
    pub icon: String,
    pub utc_offset_seconds: i32,
    pub sunrise_epoch: i64,
    pub sunset_epoch: i64,
    pub units: Units,
}

/// Forecast entry as the source returns it, before projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RawForecastSample {
    /// Naive local timestamp, e.g. `2024-05-01 15:00:00`.
    pub timestamp: String,
    pub temperature: f64,
    pub humidity_pct: u8,
    pub wind_speed: f64,
}

/// One chart point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// `H:00`, 24-hour clock.
    pub hour_label: String,
    pub temperature: i32,
    pub humidity_pct: u8,
    pub wind_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityImage {
    pub url: String,
    pub description: Option<String>,
}

impl CityImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), description: None }
    }
}

/// Sunrise and sunset projected into the place's local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: String,
    pub sunset: String,
}

/// Display region a fetch feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    Conditions,
    Forecast,
    Images,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Region::Conditions => "current conditions",
            Region::Forecast => "forecast",
            Region::Images => "city photos",
        })
    }
}

/// User-facing message attached to the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    EmptyQuery,
    NotFound(String),
    Unavailable(Region),
}

impl Notice {
    /// Higher wins when several failures of one search compete for the notice line.
    pub fn severity(&self) -> u8 {
        match self {
            Notice::Unavailable(Region::Forecast | Region::Images) => 1,
            Notice::Unavailable(Region::Conditions) => 2,
            Notice::NotFound(_) => 3,
            Notice::EmptyQuery => 4,
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notice::EmptyQuery => f.write_str("Please enter a city name"),
            Notice::NotFound(place) => write!(f, "City '{place}' not found"),
            Notice::Unavailable(region) => write!(f, "Could not load {region}, try again later"),
        }
    }
}

/// Wind direction as a 16-point compass label.
pub fn compass_point(deg: f64) -> &'static str {
    const POINTS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];
    let idx = ((deg.rem_euclid(360.0) / 22.5).round() as usize) % POINTS.len();
    POINTS[idx]
}

/// Arrow pointing where the wind blows to (meteorological degrees name where it comes from).
pub fn compass_arrow(deg: f64) -> char {
    const ARROWS: [char; 8] = ['↓', '↙', '←', '↖', '↑', '↗', '→', '↘'];
    let idx = ((deg.rem_euclid(360.0) / 45.0).round() as usize) % ARROWS.len();
    ARROWS[idx]
}
