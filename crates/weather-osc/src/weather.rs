//! Weather parameters and the raw snapshot extracted from an API response.

use serde_json::Value;
use std::fmt;

use crate::error::DataError;

/// One of the five readings forwarded over OSC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    Temp,
    Wind,
    Rain,
    Pressure,
    Humidity,
}

impl Parameter {
    /// All parameters in port order.
    pub const ALL: [Parameter; 5] = [
        Parameter::Temp,
        Parameter::Wind,
        Parameter::Rain,
        Parameter::Pressure,
        Parameter::Humidity,
    ];

    /// Key used in the `ranges` section of the config file.
    pub fn key(self) -> &'static str {
        match self {
            Parameter::Temp => "temp",
            Parameter::Wind => "wind",
            Parameter::Rain => "rain",
            Parameter::Pressure => "pressure",
            Parameter::Humidity => "humidity",
        }
    }

    /// OSC address the normalized value is sent to.
    pub fn address(self) -> &'static str {
        match self {
            Parameter::Temp => "/weather/temp",
            Parameter::Wind => "/weather/wind",
            Parameter::Rain => "/weather/rain",
            Parameter::Pressure => "/weather/pressure",
            Parameter::Humidity => "/weather/humidity",
        }
    }

    /// Offset from `base_port` of this parameter's dedicated port.
    pub fn port_offset(self) -> u16 {
        match self {
            Parameter::Temp => 0,
            Parameter::Wind => 1,
            Parameter::Rain => 2,
            Parameter::Pressure => 3,
            Parameter::Humidity => 4,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Parameter::Temp => "Temp",
            Parameter::Wind => "Wind",
            Parameter::Rain => "Rain",
            Parameter::Pressure => "Pressure",
            Parameter::Humidity => "Humidity",
        }
    }

    /// Decimal places used when logging the raw value.
    pub(crate) fn log_precision(self) -> usize {
        match self {
            Parameter::Pressure | Parameter::Humidity => 0,
            _ => 1,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Offset of the monitor port that receives every parameter.
pub const MONITOR_PORT_OFFSET: u16 = 5;

/// Raw readings from one OpenWeatherMap response, in the configured units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSnapshot {
    pub temp: f64,
    pub wind: f64,
    /// Precipitation over the last hour; upstream omits it when dry
    pub rain: f64,
    pub pressure: f64,
    pub humidity: f64,
}

impl WeatherSnapshot {
    /// Extract the five readings from a current-weather JSON body.
    ///
    /// Expected shape:
    /// `{main: {temp, pressure, humidity}, wind: {speed}, rain?: {"1h": n}}`
    pub fn from_json(body: &Value) -> Result<Self, DataError> {
        Ok(Self {
            temp: required(body, &["main", "temp"])?,
            wind: required(body, &["wind", "speed"])?,
            rain: optional(body, &["rain", "1h"])?.unwrap_or(0.0),
            pressure: required(body, &["main", "pressure"])?,
            humidity: required(body, &["main", "humidity"])?,
        })
    }

    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Temp => self.temp,
            Parameter::Wind => self.wind,
            Parameter::Rain => self.rain,
            Parameter::Pressure => self.pressure,
            Parameter::Humidity => self.humidity,
        }
    }
}

fn required(body: &Value, path: &[&str]) -> Result<f64, DataError> {
    optional(body, path)?.ok_or_else(|| DataError::MissingField(path.join(".")))
}

fn optional(body: &Value, path: &[&str]) -> Result<Option<f64>, DataError> {
    let mut node = body;
    for key in path {
        match node.get(key) {
            Some(next) => node = next,
            None => return Ok(None),
        }
    }
    if node.is_null() {
        return Ok(None);
    }
    node.as_f64()
        .map(Some)
        .ok_or_else(|| DataError::InvalidField(path.join(".")))
}
