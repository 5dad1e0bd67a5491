// Forced bring-up and calibration example
//
// This example runs the full bring-up sequence, including the calibration sweep over all
// voltage ranges, and reports every read-back that differed from the expected value.

use clap::Parser;
use peryscope_rs::{DeviceSession, PeryConnector, SessionConfig, VerificationMismatch};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "calibration")]
#[command(about = "Run the Perytech bring-up and calibration sweep")]
struct Args {
    /// How long the ADC runs for each calibration range, in milliseconds
    #[arg(long, default_value_t = 64)]
    hold_ms: u64,

    /// Extra pause while acquisition is disabled for range switches, in milliseconds
    #[arg(long, default_value_t = 0)]
    settle_ms: u64,

    /// USB transfer timeout in milliseconds
    #[arg(short, long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Enable verbose logging
    #[arg(short, long, help = "Show every register access")]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    #[cfg(feature = "cpu-profiling")]
    let _profiler = tracy_client::Client::start();

    println!("PeryScope Calibration Example");
    println!("=============================\n");

    let transport = PeryConnector::connect(Some(Duration::from_millis(args.timeout_ms)))?;
    let config = SessionConfig::default()
        .with_calibration_hold(Duration::from_millis(args.hold_ms))
        .with_range_settle(Duration::from_millis(args.settle_ms));

    let started = std::time::Instant::now();
    let (session, report) = DeviceSession::open(transport, config, true)?;
    println!("Bring-up took {:.2}s", started.elapsed().as_secs_f64());

    if report.is_clean() {
        println!("✓ Every read-back matched");
    } else {
        println!("⚠ {} read-back(s) differed:", report.mismatches.len());
        for mismatch in &report.mismatches {
            match mismatch {
                VerificationMismatch::Register { .. } => println!("  register  {mismatch}"),
                VerificationMismatch::ShiftStatus { .. } => println!("  shift     {mismatch}"),
            }
        }
    }

    let config = session.config_snapshot();
    println!("\nState after bring-up:");
    println!("  VOLTAGE_DIV      0x{:04x}", config.voltage_div_register());
    println!("  VOLTAGE_COUPLING 0x{:04x}", config.voltage_coupling_register());
    println!("  TRIG_LEVEL       0x{:04x}", config.trigger_level_register());
    if let Some(rate) = config.sample_rate() {
        println!("  Sample rate      {rate}");
    }
    println!("  Status           {}", session.status_snapshot()?);

    session.close();
    Ok(())
}
