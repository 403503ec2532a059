//! Bridge configuration: file/flag merging, defaults and validation.
//!
//! Settings come from up to three places, in priority order:
//! 1. the YAML config file (JSON files work too, YAML being a superset)
//! 2. command line flags
//! 3. the `OPENWEATHER_API_KEY` environment variable (API key only)
//!
//! Each source produces a [`PartialConfig`]; they are layered with
//! [`PartialConfig::or`] and turned into a validated [`Config`] by
//! [`PartialConfig::resolve`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::api::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::weather::{Parameter, MONITOR_PORT_OFFSET};

/// Value shipped in example configs; rejected at startup.
pub const PLACEHOLDER_API_KEY: &str = "YOUR_OPENWEATHERMAP_API_KEY_HERE";

/// Environment variable consulted when no API key is configured.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_BASE_PORT: u16 = 7400;
/// 30 minutes
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1800;

/// Unit system requested from the API; decides the units of raw readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Fahrenheit, miles per hour
    #[default]
    Imperial,
    /// Celsius, meters per second
    Metric,
}

impl UnitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Imperial => "imperial",
            UnitSystem::Metric => "metric",
        }
    }
}

impl FromStr for UnitSystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "imperial" => Ok(UnitSystem::Imperial),
            "metric" => Ok(UnitSystem::Metric),
            other => Err(format!(
                "invalid units '{}', expected 'imperial' or 'metric'",
                other
            )),
        }
    }
}

/// Normalization bounds for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    /// Suffix printed after raw values in the log
    #[serde(default)]
    pub unit: String,
}

impl Range {
    pub fn new(min: f64, max: f64, unit: &str) -> Self {
        Self {
            min,
            max,
            unit: unit.to_string(),
        }
    }

    fn validate(&self, parameter: Parameter) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "range for '{}' must have finite bounds",
                parameter.key()
            )));
        }
        if self.max <= self.min {
            return Err(ConfigError::Invalid(format!(
                "range for '{}' must have max > min, got min={} max={}",
                parameter.key(),
                self.min,
                self.max
            )));
        }
        Ok(())
    }
}

/// One range per parameter. Serialized as a `name -> {min, max, unit}` mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranges {
    pub temp: Range,
    pub wind: Range,
    pub rain: Range,
    pub pressure: Range,
    pub humidity: Range,
}

impl Default for Ranges {
    fn default() -> Self {
        Self::defaults_for(UnitSystem::Imperial)
    }
}

impl Ranges {
    pub fn defaults_for(units: UnitSystem) -> Self {
        let (temp, wind) = match units {
            UnitSystem::Imperial => (Range::new(0.0, 100.0, "F"), Range::new(0.0, 25.0, "mph")),
            UnitSystem::Metric => (Range::new(-18.0, 38.0, "C"), Range::new(0.0, 11.0, "m/s")),
        };
        Self {
            temp,
            wind,
            rain: Range::new(0.0, 5.0, "mm"),
            pressure: Range::new(980.0, 1040.0, "hPa"),
            humidity: Range::new(0.0, 100.0, "%"),
        }
    }

    pub fn get(&self, parameter: Parameter) -> &Range {
        match parameter {
            Parameter::Temp => &self.temp,
            Parameter::Wind => &self.wind,
            Parameter::Rain => &self.rain,
            Parameter::Pressure => &self.pressure,
            Parameter::Humidity => &self.humidity,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Parameter::ALL
            .into_iter()
            .try_for_each(|p| self.get(p).validate(p))
    }
}

/// Ranges section as found in a config file; unspecified entries use defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialRanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pressure: Option<Range>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<Range>,
}

impl PartialRanges {
    fn or(self, fallback: PartialRanges) -> PartialRanges {
        PartialRanges {
            temp: self.temp.or(fallback.temp),
            wind: self.wind.or(fallback.wind),
            rain: self.rain.or(fallback.rain),
            pressure: self.pressure.or(fallback.pressure),
            humidity: self.humidity.or(fallback.humidity),
        }
    }

    fn resolve(self, units: UnitSystem) -> Ranges {
        let defaults = Ranges::defaults_for(units);
        Ranges {
            temp: self.temp.unwrap_or(defaults.temp),
            wind: self.wind.unwrap_or(defaults.wind),
            rain: self.rain.unwrap_or(defaults.rain),
            pressure: self.pressure.unwrap_or(defaults.pressure),
            humidity: self.humidity.unwrap_or(defaults.humidity),
        }
    }
}

impl From<Ranges> for PartialRanges {
    fn from(ranges: Ranges) -> Self {
        Self {
            temp: Some(ranges.temp),
            wind: Some(ranges.wind),
            rain: Some(ranges.rain),
            pressure: Some(ranges.pressure),
            humidity: Some(ranges.humidity),
        }
    }
}

/// Settings from a single source, every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// City name or "City,Country"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_port: Option<u16>,
    /// Seconds between polls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<UnitSystem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<PartialRanges>,
    /// Current-weather endpoint, for proxies and local stubs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl PartialConfig {
    /// Load settings from a YAML (or JSON) file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Parse settings from a YAML string
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// API key from the environment, if set and non-empty.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()),
            ..Self::default()
        }
    }

    /// Layer `self` over `fallback`: fields set here win, ranges merge per parameter.
    pub fn or(self, fallback: PartialConfig) -> PartialConfig {
        let ranges = match (self.ranges, fallback.ranges) {
            (Some(primary), Some(secondary)) => Some(primary.or(secondary)),
            (primary, secondary) => primary.or(secondary),
        };
        PartialConfig {
            api_key: self.api_key.or(fallback.api_key),
            location: self.location.or(fallback.location),
            host: self.host.or(fallback.host),
            base_port: self.base_port.or(fallback.base_port),
            poll_interval: self.poll_interval.or(fallback.poll_interval),
            units: self.units.or(fallback.units),
            ranges,
            api_url: self.api_url.or(fallback.api_url),
        }
    }

    /// Fill in defaults and validate.
    pub fn resolve(self) -> Result<Config, ConfigError> {
        let units = self.units.unwrap_or_default();
        let config = Config {
            api_key: non_empty(self.api_key).ok_or(ConfigError::Missing("api_key"))?,
            location: non_empty(self.location).ok_or(ConfigError::Missing("location"))?,
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            base_port: self.base_port.unwrap_or(DEFAULT_BASE_PORT),
            poll_interval: Duration::from_secs(
                self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            ),
            units,
            ranges: self.ranges.unwrap_or_default().resolve(units),
            api_url: non_empty(self.api_url).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Template written by `--create-config`.
    pub fn example() -> Self {
        Self {
            api_key: Some(PLACEHOLDER_API_KEY.to_string()),
            location: Some("New York".to_string()),
            host: Some(DEFAULT_HOST.to_string()),
            base_port: Some(DEFAULT_BASE_PORT),
            poll_interval: Some(DEFAULT_POLL_INTERVAL_SECS),
            units: Some(UnitSystem::Imperial),
            ranges: Some(Ranges::default().into()),
            api_url: None,
        }
    }

    /// Write [`PartialConfig::example`] to `path` as YAML.
    pub fn write_example(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml =
            serde_yaml::to_string(&Self::example()).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let contents = format!(
            "# weather-osc configuration\n# Get a free API key at https://openweathermap.org/api\n{}",
            yaml
        );
        std::fs::write(path, contents)
            .map_err(|e| ConfigError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Fully resolved configuration, immutable for the life of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub location: String,
    pub host: String,
    pub base_port: u16,
    pub poll_interval: Duration,
    pub units: UnitSystem,
    pub ranges: Ranges,
    pub api_url: String,
}

impl Config {
    /// Layer the config file (if any) over CLI `flags` and `env`, then resolve.
    ///
    /// Fails with [`ConfigError::NoSource`] when neither the file nor the
    /// flags name both an API key and a location.
    pub fn load(
        path: Option<&Path>,
        flags: PartialConfig,
        env: PartialConfig,
    ) -> Result<Config, ConfigError> {
        let file = match path {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                PartialConfig::from_file(path)?
            }
            None => PartialConfig::default(),
        };

        let merged = file.or(flags).or(env);
        if merged.api_key.is_none() || merged.location.is_none() {
            return Err(ConfigError::NoSource);
        }
        merged.resolve()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key == PLACEHOLDER_API_KEY {
            return Err(ConfigError::PlaceholderApiKey {
                placeholder: PLACEHOLDER_API_KEY,
            });
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.base_port == 0 || self.base_port.checked_add(MONITOR_PORT_OFFSET).is_none() {
            return Err(ConfigError::Invalid(format!(
                "base_port must be between 1 and {}, got {}",
                u16::MAX - MONITOR_PORT_OFFSET,
                self.base_port
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid("poll_interval must be at least 1 second".into()));
        }
        self.ranges.validate()
    }

    /// Port receiving every parameter.
    pub fn monitor_port(&self) -> u16 {
        self.base_port + MONITOR_PORT_OFFSET
    }
}
