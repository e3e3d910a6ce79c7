//! Core library for the `citycast` weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Sources for current conditions, forecast and city photos
//! - The search pipeline that reconciles their results into one state
//! - The local clock derived from a place's UTC offset
//!
//! It is used by `citycast-cli`, but knows nothing about rendering.

pub mod clock;
pub mod config;
pub mod error;
pub mod forecast;
pub mod icon;
pub mod images;
pub mod model;
pub mod search;
pub mod source;
pub mod state;

pub use clock::{ClockHandle, ClockSlot, SystemClock, TimeSource, start_clock};
pub use config::{Config, Credentials, ServiceId, Units};
pub use error::{ConfigError, FetchError, SearchError};
pub use model::{CityImage, CurrentConditions, ForecastSample, Notice, Region, SunTimes};
pub use search::{Dashboard, SearchSettings, validate_place};
pub use source::{ForecastSource, ImageSource, Sources, WeatherSource};
pub use state::SearchState;
