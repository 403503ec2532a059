//! Error types for the weather bridge.

use thiserror::Error;

/// Configuration could not be loaded or failed validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// A required field was provided neither by the config file nor by flags
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    /// Neither a config file nor flags named both an API key and a location
    #[error(
        "Must provide either --config file or both --api-key and --location \
         (the API key may also come from OPENWEATHER_API_KEY)"
    )]
    NoSource,

    #[error("Please replace {placeholder} with your actual API key")]
    PlaceholderApiKey { placeholder: &'static str },

    #[error("Validation error: {0}")]
    Invalid(String),
}

/// A single attempt to fetch weather data failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("HTTP error: {status}")]
    Status { status: u16 },

    /// Upstream answered 2xx but the body was not usable JSON
    #[error("invalid response body: {0}")]
    Body(String),
}

impl FetchError {
    /// Split fatal failures off from retryable ones.
    ///
    /// Returns the error unchanged when a retry may help, or the matching
    /// [`FatalError`] for the queried `location` when it cannot.
    pub fn classify(self, location: &str) -> Result<FetchError, FatalError> {
        match self {
            FetchError::Status { status: 401 } => Err(FatalError::InvalidApiKey),
            FetchError::Status { status: 404 } => {
                Err(FatalError::LocationNotFound(location.to_string()))
            }
            other => Ok(other),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Body(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Conditions that terminate the bridge.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FatalError {
    #[error("Invalid API key - check your configuration")]
    InvalidApiKey,

    #[error("Location '{0}' not found")]
    LocationNotFound(String),
}

/// The response did not have the expected shape.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("Missing expected data field: {0}")]
    MissingField(String),

    #[error("Data field {0} is not a number")]
    InvalidField(String),
}
