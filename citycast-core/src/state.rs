use serde::Serialize;

use crate::{
    clock::format_hour_minute,
    model::{CityImage, CurrentConditions, ForecastSample, Notice, SunTimes},
};

/// Everything the dashboard shows, published as one snapshot per change.
///
/// `conditions`, `clock_offset` and `sun_times` always change together;
/// `forecast` and `images` change on their own.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    /// Place of the current search while any of its fetches is outstanding.
    pub query_in_flight: Option<String>,
    pub conditions: Option<CurrentConditions>,
    pub clock_offset: Option<i32>,
    pub sun_times: Option<SunTimes>,
    /// Latest clock tick, `HH:MM:SS`.
    pub local_time: Option<String>,
    pub forecast: Vec<ForecastSample>,
    pub images: Vec<CityImage>,
    pub notice: Option<Notice>,
    /// Generation of the most recent valid search.
    pub generation: u64,
    /// Bumped on every change except clock ticks.
    pub revision: u64,
}

impl SearchState {
    pub fn is_settled(&self) -> bool {
        self.query_in_flight.is_none()
    }

    pub(crate) fn begin(&mut self, place: &str, generation: u64) {
        self.query_in_flight = Some(place.to_string());
        self.generation = generation;
        self.notice = None;
    }

    pub(crate) fn set_conditions(&mut self, conditions: CurrentConditions, local_time: String) {
        let offset = conditions.utc_offset_seconds;
        self.sun_times = Some(SunTimes {
            sunrise: format_hour_minute(conditions.sunrise_epoch, offset),
            sunset: format_hour_minute(conditions.sunset_epoch, offset),
        });
        self.clock_offset = Some(offset);
        self.local_time = Some(local_time);
        self.conditions = Some(conditions);
    }

    /// Show `notice` unless a more severe one is already up.
    pub(crate) fn raise(&mut self, notice: Notice) {
        let keep = self
            .notice
            .as_ref()
            .is_some_and(|current| current.severity() > notice.severity());
        if !keep {
            self.notice = Some(notice);
        }
    }

    pub(crate) fn clear_conditions(&mut self) {
        self.conditions = None;
        self.clock_offset = None;
        self.sun_times = None;
        self.local_time = None;
    }
}
