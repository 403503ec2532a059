//! OpenWeatherMap current-weather client.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::config::{Config, UnitSystem};
use crate::error::FetchError;

/// Current weather endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Upper bound for a single request, connect included.
pub const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can produce one raw weather response per call.
///
/// Retries are not the source's concern; see `PollLoop::fetch`.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Location being queried, used when reporting a 404.
    fn location(&self) -> &str;

    /// Perform a single fetch attempt.
    async fn fetch_once(&self) -> Result<Value, FetchError>;
}

/// HTTP client for `GET /data/2.5/weather?q=..&appid=..&units=..`.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    location: String,
    api_key: String,
    units: UnitSystem,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        Self::with_timeout(config, API_TIMEOUT)
    }

    pub fn with_timeout(config: &Config, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            location: config.location.clone(),
            api_key: config.api_key.clone(),
            units: config.units,
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    fn location(&self) -> &str {
        &self.location
    }

    async fn fetch_once(&self) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", self.location.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", self.units.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FetchError::Body(e.to_string()))
    }
}
