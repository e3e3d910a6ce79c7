//! Shaping raw forecast entries into chart samples.

use chrono::{NaiveDateTime, Timelike};

use crate::config::MAX_FORECAST_SAMPLES;
use crate::model::{ForecastSample, RawForecastSample};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Project raw entries to chart samples, keeping source order.
///
/// The hour label comes from the timestamp as written; it is not shifted by
/// the place's UTC offset. Entries with an unreadable timestamp are dropped.
pub fn project(raw: &[RawForecastSample]) -> Vec<ForecastSample> {
    raw.iter()
        .take(MAX_FORECAST_SAMPLES)
        .filter_map(|entry| {
            let Some(hour) = hour_of_day(&entry.timestamp) else {
                tracing::warn!(timestamp = %entry.timestamp, "skipping forecast entry with unreadable timestamp");
                return None;
            };

            Some(ForecastSample {
                hour_label: format!("{hour}:00"),
                temperature: whole_degrees(entry.temperature),
                humidity_pct: entry.humidity_pct,
                wind_speed: entry.wind_speed,
            })
        })
        .collect()
}

/// Temperatures are shown as whole degrees, truncated toward zero.
pub fn whole_degrees(value: f64) -> i32 {
    value.trunc() as i32
}

fn hour_of_day(timestamp: &str) -> Option<u32> {
    let timestamp = timestamp.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(timestamp, fmt).ok())
        .map(|dt| dt.hour())
}
