// Data acquisition example
//
// This example configures both channels and a trigger, then captures repeatedly and prints
// a summary of every capture.

use clap::Parser;
use peryscope_rs::{
    AcquisitionRequest, AcquisitionResult, Channel, Coupling, DeviceSession, SampleRate,
    SessionConfig, TriggerSetting, VoltageRange,
};
use polars::prelude::*;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "data_acquisition")]
#[command(about = "Capture data from a Perytech DSO")]
struct Args {
    /// Samples per channel and capture
    #[arg(short, long, default_value_t = 2000)]
    samples: usize,

    /// Sample rate, e.g. "100kS/s" or "200MS/s"
    #[arg(short, long, default_value = "1MS/s", value_parser = parse_rate)]
    rate: SampleRate,

    /// Voltage range of both channels, e.g. "200mV" or "1V"
    #[arg(long, default_value = "1V", value_parser = parse_range)]
    range: VoltageRange,

    /// Use AC coupling instead of DC
    #[arg(long)]
    ac: bool,

    /// Trigger level on channel 1 (ADC counts around mid-scale)
    #[arg(long, default_value_t = 10, allow_hyphen_values = true)]
    level: i8,

    /// Trigger timeout in milliseconds
    #[arg(short, long, default_value_t = 100)]
    timeout_ms: u64,

    /// Read cursor offset relative to the trigger sample
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: i32,

    /// Number of captures
    #[arg(short, long, default_value_t = 10)]
    count: usize,

    /// Repeat the full bring-up even if the device is already initialized
    #[arg(long)]
    force: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Show debug information and detailed logs")]
    verbose: bool,
}

fn parse_rate(s: &str) -> Result<SampleRate, String> {
    SampleRate::ALL
        .into_iter()
        .find(|rate| rate.to_string().replace(' ', "").eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown sample rate {s}"))
}

fn parse_range(s: &str) -> Result<VoltageRange, String> {
    VoltageRange::ALL
        .into_iter()
        .find(|range| range.to_string().replace(' ', "").eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown voltage range {s}"))
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

    println!("PeryScope Data Acquisition Example");
    println!("==================================\n");

    let (session, _) = DeviceSession::connect(SessionConfig::default(), args.force)?;
    println!("Connected, session {}\n", session.state());

    let coupling = if args.ac { Coupling::Ac } else { Coupling::Dc };
    session.set_sample_rate(args.rate)?;
    for channel in [Channel::Ch1, Channel::Ch2] {
        session.set_voltage_range(channel, args.range)?;
        session.set_coupling(channel, coupling)?;
    }
    let trigger = TriggerSetting::start_capturing_when(Channel::Ch1).rises_above(args.level);
    session.apply_trigger(&trigger)?;
    println!(
        "Rate {}, range {}, {:?} coupling, trigger CH1 > {:+}\n",
        args.rate, args.range, coupling, args.level
    );

    let request = AcquisitionRequest::new(args.samples)
        .with_trigger_timeout(Duration::from_millis(args.timeout_ms))
        .with_trigger_offset(args.offset);

    let started = Instant::now();
    for i in 0..args.count {
        let result = session.acquire(&request)?;
        print_summary(i, &result)?;
    }
    let elapsed = started.elapsed().as_secs_f64();
    println!(
        "\n{} captures in {:.2}s ({:.1} Hz)",
        args.count,
        elapsed,
        args.count as f64 / elapsed
    );

    session.close();
    Ok(())
}

fn print_summary(i: usize, result: &AcquisitionResult) -> Result<(), PolarsError> {
    let summary = result
        .to_lazy_frame()?
        .select([
            col("ch1").min().alias("ch1_min"),
            col("ch1").max().alias("ch1_max"),
            col("ch2").min().alias("ch2_min"),
            col("ch2").max().alias("ch2_max"),
        ])
        .collect()?;

    let value = |name: &str| -> Result<i32, PolarsError> {
        Ok(summary.column(name)?.i32()?.get(0).unwrap_or_default())
    };

    println!(
        "[{i:3}] {} {} samples | CH1 {}..{} | CH2 {}..{} | status {}",
        if result.triggered { "TRIG   " } else { "NO TRIG" },
        result.sample_count(),
        value("ch1_min")?,
        value("ch1_max")?,
        value("ch2_min")?,
        value("ch2_max")?,
        result.status
    );
    Ok(())
}
