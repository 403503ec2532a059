//! The fetch → normalize → send → sleep loop.

use serde_json::Value;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;

use crate::api::WeatherSource;
use crate::config::Config;
use crate::error::{DataError, FatalError, FetchError};
use crate::normalize::NormalizedReading;
use crate::osc::{Destinations, OscMessage, OscSink};
use crate::weather::{Parameter, WeatherSnapshot};

/// Total attempts per poll cycle, first try included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Pause between attempts.
pub const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

/// Result of [`PollLoop::fetch`].
#[derive(Debug)]
pub enum FetchOutcome {
    Success(Value),
    /// Every attempt failed with a transient error; holds the last one
    Retryable(FetchError),
    /// Retrying cannot help; the bridge should stop
    Fatal(FatalError),
}

/// What happened during one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Sent(NormalizedReading),
    FetchFailed,
    BadData(DataError),
}

/// Owns the configuration, the weather source and the OSC senders for one run.
pub struct PollLoop<S, K> {
    config: Config,
    source: S,
    sink: K,
    destinations: Destinations,
    retry: RetryPolicy,
}

impl<S: WeatherSource, K: OscSink> PollLoop<S, K> {
    pub fn new(config: Config, source: S, sink: K, destinations: Destinations) -> Self {
        Self {
            config,
            source,
            sink,
            destinations,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch one weather response, retrying transient failures.
    ///
    /// 401 and 404 are reported as [`FetchOutcome::Fatal`] on the first
    /// occurrence without further attempts.
    pub async fn fetch(&self) -> FetchOutcome {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.source.fetch_once().await {
                Ok(body) => return FetchOutcome::Success(body),
                Err(err) => err,
            };

            // Fatal errors are logged once, by whoever stops the bridge
            let err = match err.classify(self.source.location()) {
                Ok(err) => err,
                Err(fatal) => return FetchOutcome::Fatal(fatal),
            };

            match &err {
                FetchError::Timeout => {
                    log::error!("Request timeout (attempt {}/{})", attempt, attempts)
                }
                FetchError::Status { status } => {
                    log::error!("HTTP error: {} (attempt {}/{})", status, attempt, attempts)
                }
                other => log::error!("{} (attempt {}/{})", other, attempt, attempts),
            }

            if attempt >= attempts {
                return FetchOutcome::Retryable(err);
            }

            log::info!("Retrying in {}s...", self.retry.delay.as_secs());
            tokio::time::sleep(self.retry.delay).await;
            attempt += 1;
        }
    }

    /// Normalize a response body and send it to every destination.
    ///
    /// Nothing is sent unless all five readings could be extracted.
    pub async fn parse_and_send(&self, body: &Value) -> Result<NormalizedReading, DataError> {
        let snapshot = WeatherSnapshot::from_json(body)?;
        let ranges = &self.config.ranges;
        let reading = NormalizedReading::from_snapshot(&snapshot, ranges);

        for parameter in Parameter::ALL {
            let target = self.destinations.parameter(parameter);
            self.send(target, parameter, reading.get(parameter)).await;
        }
        // Monitor display gets a copy of everything
        for parameter in Parameter::ALL {
            self.send(self.destinations.monitor(), parameter, reading.get(parameter))
                .await;
        }

        log::info!("Sent - {}", reading.summary(&snapshot, ranges));
        Ok(reading)
    }

    async fn send(&self, target: SocketAddr, parameter: Parameter, value: f64) {
        let message = OscMessage::float(parameter.address(), value as f32);
        if let Err(e) = self.sink.send(target, &message).await {
            log::warn!("Failed to send {} to {}: {}", parameter.address(), target, e);
        }
    }

    /// Run a single fetch + send cycle.
    pub async fn poll_once(&self) -> Result<CycleOutcome, FatalError> {
        match self.fetch().await {
            FetchOutcome::Success(body) => match self.parse_and_send(&body).await {
                Ok(reading) => Ok(CycleOutcome::Sent(reading)),
                Err(e) => {
                    log::error!("{}", e);
                    Ok(CycleOutcome::BadData(e))
                }
            },
            FetchOutcome::Retryable(_) => {
                log::warn!("Failed to fetch weather data after retries");
                Ok(CycleOutcome::FetchFailed)
            }
            FetchOutcome::Fatal(e) => Err(e),
        }
    }

    /// Poll until `shutdown` fires or a fatal error occurs.
    ///
    /// Shutdown interrupts an in-flight fetch, a retry delay or the sleep
    /// between cycles.
    pub async fn run(&self, mut shutdown: watch::Receiver<()>) -> Result<(), FatalError> {
        log::info!("Weather OSC bridge started - press Ctrl+C to stop");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                outcome = self.poll_once() => {
                    outcome?;
                }
            }

            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        log::info!("Polling stopped");
        Ok(())
    }
}
