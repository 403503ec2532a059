//! Linear rescaling of raw readings into the 0..1 control range.

use std::fmt::Write as _;

use crate::config::{Range, Ranges};
use crate::weather::{Parameter, WeatherSnapshot};

/// Rescale `value` so that `range.min` maps to 0.0 and `range.max` to 1.0,
/// clamping anything outside the range.
///
/// Ranges are validated at config load (`max > min`, both finite), so the
/// denominator is never zero here. A NaN reading maps to 0.0.
pub fn normalize(value: f64, range: &Range) -> f64 {
    let scaled = (value - range.min) / (range.max - range.min);
    if scaled.is_nan() {
        return 0.0;
    }
    scaled.clamp(0.0, 1.0)
}

/// The five normalized values of one poll cycle, each within [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedReading {
    pub temp: f64,
    pub wind: f64,
    pub rain: f64,
    pub pressure: f64,
    pub humidity: f64,
}

impl NormalizedReading {
    pub fn from_snapshot(snapshot: &WeatherSnapshot, ranges: &Ranges) -> Self {
        let n = |p: Parameter| normalize(snapshot.get(p), ranges.get(p));
        Self {
            temp: n(Parameter::Temp),
            wind: n(Parameter::Wind),
            rain: n(Parameter::Rain),
            pressure: n(Parameter::Pressure),
            humidity: n(Parameter::Humidity),
        }
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

    /// Human-readable line with raw value, unit and normalized value per parameter,
    /// e.g. `Temp: 72.0F (0.72), Wind: 5.0mph (0.20), ...`
    pub fn summary(&self, snapshot: &WeatherSnapshot, ranges: &Ranges) -> String {
        let mut line = String::new();
        for (i, p) in Parameter::ALL.into_iter().enumerate() {
            if i > 0 {
                line.push_str(", ");
            }
            let _ = write!(
                line,
                "{}: {:.prec$}{} ({:.2})",
                p,
                snapshot.get(p),
                ranges.get(p).unit,
                self.get(p),
                prec = p.log_precision()
            );
        }
        line
    }
}
