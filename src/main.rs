use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use treasure_seeker::hardware::open_sysfs_buzzer;
use treasure_seeker::{ConfigError, DeviceConfig, DeviceError, ProximityDetector, SerialTransport};

const DEFAULT_CONFIG: &str = "config.json";

/// Beeps faster as the GPS fix approaches the target
#[derive(Parser, Debug)]
#[command(name = "treasure-seeker", version, about)]
struct Cli {
    /// JSON configuration file [default: ./config.json if present]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// GPS serial device, overrides the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Target latitude in decimal degrees
    #[arg(allow_negative_numbers = true, requires = "longitude")]
    latitude: Option<f64>,

    /// Target longitude in decimal degrees
    #[arg(allow_negative_numbers = true)]
    longitude: Option<f64>,
}

fn load_config(cli: &Cli) -> Result<DeviceConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => DeviceConfig::load_from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => DeviceConfig::load_from_file(DEFAULT_CONFIG)?,
        None => DeviceConfig::default(),
    };

    if let Some(port) = &cli.port {
        config.transport.port = port.clone();
    }
    if let (Some(latitude), Some(longitude)) = (cli.latitude, cli.longitude) {
        config = config.with_target(latitude, longitude)?;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), DeviceError> {
    let config = load_config(cli)?;
    let target = config.target_location()?;
    info!("Seeking {} via {}", target, config.transport.port);

    let transport = SerialTransport::open(config.transport.clone())?;
    let buzzer = open_sysfs_buzzer(&config.buzzer)?;
    let mut detector = ProximityDetector::new(config, transport, buzzer)?;

    let stop = detector.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.stop()) {
        warn!("Could not install signal handler: {}", e);
    }

    detector.run()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .parse_filters(&cli.log_level)
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
