use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{debug, error, info};

use realflight_link::{Configuration, ControlLink, LinkError, MotionIntent};

/// Takes over a RealFlight aircraft, holds a motion intent for a while and hands
/// control back.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// RealFlight Link address, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// Forward velocity in m/s, negative flies backwards
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    forward: f32,

    /// Lateral velocity in m/s, positive to the left
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    lateral: f32,

    /// Vertical velocity in m/s, positive climbs
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    vertical: f32,

    /// Yaw rate
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    yaw: f32,

    /// How long to hold the motion
    #[arg(long, default_value_t = 2000)]
    duration_ms: u64,

    /// Time between exchange cycles
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Telemetry log file, overrides the configuration
    #[arg(long)]
    log: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("realflight_link: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), LinkError> {
    let mut configuration = match &args.config {
        Some(path) => Configuration::from_file(path)?,
        None => Configuration::default(),
    };
    if let Some(host) = &args.host {
        configuration.simulator_host = host.clone();
    }
    if let Some(log) = &args.log {
        configuration.telemetry_log = Some(log.clone());
    }
    debug!("{:?}", configuration);

    let mut link = ControlLink::with_configuration(&configuration)?;
    info!("Connecting to RealFlight at {}", configuration.simulator_host);
    link.connect()?;

    let intent = MotionIntent::new(args.forward, args.lateral, args.vertical, args.yaw);
    let result = fly(&mut link, &intent, args);

    // Control goes back to the simulator even when the flight was cut short.
    let released = link.disconnect();
    result?;
    released?;

    let statistics = link.statistics();
    println!("Runtime: {:?}", statistics.runtime);
    println!("Exchanges: {}", statistics.exchange_count);
    println!("Requests: {}", statistics.request_count);
    println!("Errors: {}", statistics.error_count);
    println!("Frequency: {:.2} Hz", statistics.frequency);

    Ok(())
}

fn fly(link: &mut ControlLink, intent: &MotionIntent, args: &Args) -> Result<(), LinkError> {
    let interval = Duration::from_millis(args.interval_ms);
    let until = Instant::now() + Duration::from_millis(args.duration_ms);

    while Instant::now() < until {
        let telemetry = link.set_motion(intent)?;
        println!(
            "t={:.3}s alt={:.2}m airspeed={:.2}m/s status={}",
            telemetry.timestamp, telemetry.altitude_agl, telemetry.airspeed, telemetry.status
        );
        thread::sleep(interval);
    }

    if let Err(e) = link.set_motion(&MotionIntent::hover()) {
        error!("Failed to return to hover: {}", e);
        return Err(e);
    }
    Ok(())
}
