use thiserror::Error;

use crate::config::ServiceId;

/// Failure of a single fetch against one of the external sources.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source answered, but knows no place by that name.
    #[error("No match for '{place}'")]
    NotFound { place: String },

    /// Network, HTTP status or decoding failure.
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl FetchError {
    pub fn not_found(place: impl Into<String>) -> Self {
        Self::NotFound { place: place.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Rejection of a search before anything is fetched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Please enter a city name")]
    InvalidInput,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Missing API credentials for: {}.\n\
         Hint: run `citycast configure <service>` or set {}.",
        list_services(.0),
        list_env_vars(.0)
    )]
    MissingCredentials(Vec<ServiceId>),

    #[error("Unknown service '{0}'. Supported services: openweather, unsplash.")]
    UnknownService(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn list_services(ids: &[ServiceId]) -> String {
    ids.iter().map(ServiceId::as_str).collect::<Vec<_>>().join(", ")
}

fn list_env_vars(ids: &[ServiceId]) -> String {
    ids.iter().map(|id| id.env_var()).collect::<Vec<_>>().join(" / ")
}
