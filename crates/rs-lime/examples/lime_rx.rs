//! Stream samples from a LimeSDR to a file.
//!
//! Samples are written as raw interleaved 32-bit float I/Q (compatible
//! with GNU Radio, Inspectrum, and other SDR tools).
//!
//! # Usage
//!
//! ```sh
//! # Capture 1 second at 100 MHz, 10 MS/s
//! cargo run --example lime_rx -- -f 100000000 -s 10000000 -o samples.cf32 -d 1
//!
//! # Capture with manual gain
//! cargo run --example lime_rx -- -f 433920000 -s 2000000 -o samples.cf32 -g 40
//! ```

use num_complex::Complex;
use rs_lime::{Direction, LimeDevice, StreamConfig};
use std::env;
use std::fs::File;
use std::io::Write;
use std::process;
use std::time::{Duration, Instant};

struct Args {
    freq_hz: f64,
    sample_rate: f64,
    output_file: Option<String>,
    duration_secs: f64,
    gain_db: Option<u32>,
    channel: u32,
    help: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        freq_hz: 100e6,
        sample_rate: 10e6,
        output_file: None,
        duration_secs: 1.0,
        gain_db: None,
        channel: 0,
        help: false,
    };

    let argv: Vec<String> = env::args().collect();
    let mut i = 1;

    while i < argv.len() {
        match argv[i].as_str() {
            "-h" | "--help" => args.help = true,
            "-f" | "--freq" => {
                i += 1;
                args.freq_hz = argv.get(i).and_then(|v| v.parse().ok()).unwrap_or(args.freq_hz);
            }
            "-s" | "--rate" => {
                i += 1;
                args.sample_rate = argv
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(args.sample_rate);
            }
            "-o" | "--output" => {
                i += 1;
                args.output_file = argv.get(i).cloned();
            }
            "-d" | "--duration" => {
                i += 1;
                args.duration_secs = argv
                    .get(i)
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(args.duration_secs);
            }
            "-g" | "--gain" => {
                i += 1;
                args.gain_db = argv.get(i).and_then(|v| v.parse().ok());
            }
            "-c" | "--channel" => {
                i += 1;
                args.channel = argv.get(i).and_then(|v| v.parse().ok()).unwrap_or(0);
            }
            _ => {}
        }
        i += 1;
    }

    args
}

fn print_help() {
    println!("Usage: lime_rx [options]");
    println!("  -f, --freq <hz>       Center frequency (default 100 MHz)");
    println!("  -s, --rate <hz>       Sample rate (default 10 MS/s)");
    println!("  -o, --output <file>   Output file (default stdout)");
    println!("  -d, --duration <sec>  Capture duration (default 1.0)");
    println!("  -g, --gain <db>       Combined RX gain in dB (default: device setting)");
    println!("  -c, --channel <n>     RF channel index (default 0)");
}

fn main() {
    tracing_subscriber::fmt::init();

    let args = parse_args();
    if args.help {
        print_help();
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let device = LimeDevice::open_first()?;
    device.init()?;

    let channel = args.channel as usize;
    device.enable_channel(Direction::Rx, channel, true)?;
    device.set_sample_rate(args.sample_rate, 0)?;
    device.set_frequency(Direction::Rx, channel, args.freq_hz)?;
    if let Some(gain) = args.gain_db {
        device.set_gain_db(Direction::Rx, channel, gain)?;
    }

    let (host_rate, rf_rate) = device.sample_rate(Direction::Rx, channel)?;
    eprintln!(
        "Receiving at {:.3} MHz, {:.3} MS/s (RF {:.3} MS/s)",
        args.freq_hz / 1e6,
        host_rate / 1e6,
        rf_rate / 1e6
    );

    let mut stream = device.rx_stream(&StreamConfig {
        channel: args.channel,
        ..StreamConfig::default()
    })?;
    stream.start()?;

    let mut output: Box<dyn Write> = match &args.output_file {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    let mut buffer = vec![Complex::new(0.0f32, 0.0f32); 16384];
    let mut total: u64 = 0;
    let started = Instant::now();

    while started.elapsed().as_secs_f64() < args.duration_secs {
        let (n, _meta) = stream.recv(&mut buffer, Duration::from_millis(1000))?;
        if n == 0 {
            continue;
        }
        let bytes = unsafe {
            std::slice::from_raw_parts(buffer.as_ptr() as *const u8, n * 8)
        };
        output.write_all(bytes)?;
        total += n as u64;
    }

    let status = stream.status()?;
    eprintln!(
        "Captured {} samples ({:.3} MS/s effective), overrun: {}, dropped: {}",
        total,
        total as f64 / started.elapsed().as_secs_f64() / 1e6,
        status.overrun,
        status.dropped_packets
    );

    stream.stop()?;
    Ok(())
}
