use argh::FromArgs;
use std::path::Path;
use std::process::ExitCode;

use weather_osc::config::{PartialConfig, Range};
use weather_osc::{Config, Destinations, OpenWeatherClient, PollLoop, UdpOscSink, UnitSystem};

#[derive(FromArgs)]
/// Weather to OSC bridge: polls OpenWeatherMap and sends normalized
/// readings to OSC ports for musical control.
///
/// Get a free API key at https://openweathermap.org/api
struct Args {
    /// path to a YAML (or JSON) config file; its values take precedence over flags
    #[argh(option, short = 'c')]
    config: Option<String>,

    /// write an example config file to PATH and exit
    #[argh(option)]
    create_config: Option<String>,

    /// API key for OpenWeatherMap (or set OPENWEATHER_API_KEY)
    #[argh(option)]
    api_key: Option<String>,

    /// city name or "City,Country"
    #[argh(option)]
    location: Option<String>,

    /// OSC host (default: 127.0.0.1)
    #[argh(option)]
    host: Option<String>,

    /// OSC base port (default: 7400)
    #[argh(option)]
    port: Option<u16>,

    /// poll interval in seconds (default: 1800)
    #[argh(option)]
    interval: Option<u64>,

    /// unit system: imperial or metric (default: imperial)
    #[argh(option)]
    units: Option<UnitSystem>,

    /// weather endpoint URL (default: OpenWeatherMap current weather)
    #[argh(option)]
    api_url: Option<String>,

    /// enable debug logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

impl Args {
    fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            api_key: self.api_key.clone(),
            location: self.location.clone(),
            host: self.host.clone(),
            base_port: self.port,
            poll_interval: self.interval,
            units: self.units,
            ranges: None,
            api_url: self.api_url.clone(),
        }
    }
}

fn log_range(name: &str, range: &Range) {
    log::debug!("  {:<9} {} .. {} {}", name, range.min, range.max, range.unit);
}

async fn run(config: Config) -> anyhow::Result<()> {
    let destinations = Destinations::resolve(&config).await?;
    let sink = UdpOscSink::bind_for(&destinations).await?;
    let source = OpenWeatherClient::new(&config)?;

    log::info!(
        "Initialized OSC senders on {}:{}-{}",
        config.host,
        config.base_port,
        config.monitor_port()
    );
    log::info!(
        "Ports: {}-{} (individual params), {} (monitor display)",
        config.base_port,
        config.monitor_port() - 1,
        config.monitor_port()
    );
    log::info!(
        "Polling {} every {}s using {} units",
        config.location,
        config.poll_interval.as_secs(),
        config.units.as_str()
    );
    log::debug!("Normalization ranges:");
    log_range("temp", &config.ranges.temp);
    log_range("wind", &config.ranges.wind);
    log_range("rain", &config.ranges.rain);
    log_range("pressure", &config.ranges.pressure);
    log_range("humidity", &config.ranges.humidity);

    // Shutdown channel fed by SIGINT/SIGTERM
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(());
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    })?;

    let poll_loop = PollLoop::new(config, source, sink, destinations);
    poll_loop.run(shutdown_rx).await?;

    log::info!("Shutting down gracefully...");
    Ok(())
}

// Strictly sequential loop, a single-threaded runtime is enough
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args: Args = argh::from_env();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Some(path) = &args.create_config {
        return match PartialConfig::write_example(path) {
            Ok(()) => {
                println!("Created example config at: {}", path);
                println!("Edit this file with your API key and location, then run:");
                println!("  weather_osc --config {}", path);
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match Config::load(
        args.config.as_deref().map(Path::new),
        args.to_partial(),
        PartialConfig::from_env(),
    ) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal error: {}", e);
            ExitCode::FAILURE
        }
    }
}
