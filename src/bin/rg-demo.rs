use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use onrobot_rg::*;

/// Open and close an OnRobot RG2/RG6 gripper through the Compute Box.
#[derive(Parser, Debug)]
#[command(name = "rg-demo", long_about = None)]
struct Args {
    /// IP address of the Compute Box
    #[arg(long, default_value = ConnectionConfig::DEFAULT_HOST)]
    ip: String,

    /// Modbus TCP port of the Compute Box
    #[arg(long, default_value_t = ConnectionConfig::DEFAULT_PORT)]
    port: u16,

    /// Gripper model, rg2 or rg6
    #[arg(long, default_value = "rg2", value_parser = parse_variant)]
    gripper: GripperVariant,
}

fn parse_variant(s: &str) -> Result<GripperVariant, String> {
    s.parse().map_err(|e: RgError| e.to_string())
}

/// Force used for both moves, within the range of either variant.
const FORCE_N: f64 = 20.0;
/// Width of the second move.
const CLOSED_WIDTH_MM: f64 = 10.0;

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RgError> {
    let config = ConnectionConfig::new(args.ip.as_str(), args.port);
    // closed on drop, on every return path
    let mut gripper = RgGripper::connect_with(&config, args.gripper)?;

    // new commands are ignored while a motion is ongoing
    let status = gripper.await_ready()?;
    report("initial", &status);
    if status.safety_tripped() {
        warn!("safety circuit active, the gripper will not move until power cycled");
    }

    let open_width = gripper.register_map().max_width_mm;
    info!("opening to {open_width} mm");
    let status = gripper.set_target(open_width, FORCE_N)?.await_motion()?;
    report("opened", &status);

    info!("closing to {CLOSED_WIDTH_MM} mm");
    let status = gripper.set_target(CLOSED_WIDTH_MM, FORCE_N)?.await_motion()?;
    report("closed", &status);

    gripper.disconnect();
    Ok(())
}

fn report(label: &str, status: &GripperStatus) {
    match serde_json::to_string_pretty(status) {
        Ok(json) => println!("{label}: {json}"),
        Err(_) => println!("{label}: {status:?}"),
    }
}
