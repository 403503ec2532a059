//! OpenWeatherMap to OSC bridge.
//!
//! Polls current weather for one location, normalizes five readings into
//! the 0..1 range and sends them as OSC floats over UDP:
//! - one port per parameter (`base_port + 0..=4`)
//! - a shared monitor port receiving all five (`base_port + 5`)
//!
//! Designed for Max for Live, TouchOSC and similar control surfaces.

pub mod api;
pub mod config;
pub mod error;
pub mod normalize;
pub mod osc;
pub mod poll_loop;
pub mod weather;

pub use api::{OpenWeatherClient, WeatherSource};
pub use config::{Config, PartialConfig, Range, Ranges, UnitSystem};
pub use error::{ConfigError, DataError, FatalError, FetchError};
pub use normalize::{normalize, NormalizedReading};
pub use osc::{Destinations, OscMessage, OscSink, UdpOscSink};
pub use poll_loop::{CycleOutcome, FetchOutcome, PollLoop, RetryPolicy};
pub use weather::{Parameter, WeatherSnapshot};
