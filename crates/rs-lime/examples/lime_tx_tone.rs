//! Transmit a continuous complex tone on a LimeSDR TX channel.
//!
//! # Usage
//!
//! ```sh
//! # 1 kHz tone at 868 MHz, 2 MS/s, for 5 seconds
//! cargo run --example lime_tx_tone -- -f 868000000 -s 2000000 -t 1000 -d 5
//! ```

use num_complex::Complex;
use rs_lime::{Direction, LimeDevice, StreamConfig, StreamMeta};
use std::env;
use std::f32::consts::TAU;
use std::process;
use std::time::{Duration, Instant};

struct Args {
    freq_hz: f64,
    sample_rate: f64,
    tone_hz: f64,
    duration_secs: f64,
    gain: f64,
    channel: u32,
    help: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        freq_hz: 868e6,
        sample_rate: 2e6,
        tone_hz: 1000.0,
        duration_secs: 5.0,
        gain: 0.4,
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
            "-t" | "--tone" => {
                i += 1;
                args.tone_hz = argv.get(i).and_then(|v| v.parse().ok()).unwrap_or(args.tone_hz);
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
                args.gain = argv.get(i).and_then(|v| v.parse().ok()).unwrap_or(args.gain);
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
    println!("Usage: lime_tx_tone [options]");
    println!("  -f, --freq <hz>       Center frequency (default 868 MHz)");
    println!("  -s, --rate <hz>       Sample rate (default 2 MS/s)");
    println!("  -t, --tone <hz>       Baseband tone frequency (default 1 kHz)");
    println!("  -d, --duration <sec>  Transmit duration (default 5.0)");
    println!("  -g, --gain <0..1>     Normalized TX gain (default 0.4)");
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
    device.enable_channel(Direction::Tx, channel, true)?;
    device.set_sample_rate(args.sample_rate, 0)?;
    device.set_frequency(Direction::Tx, channel, args.freq_hz)?;
    device.set_normalized_gain(Direction::Tx, channel, args.gain)?;

    let mut stream = device.tx_stream(&StreamConfig {
        channel: args.channel,
        ..StreamConfig::default()
    })?;
    stream.start()?;

    eprintln!(
        "Transmitting {:.1} kHz tone at {:.3} MHz for {} s",
        args.tone_hz / 1e3,
        args.freq_hz / 1e6,
        args.duration_secs
    );

    // One full cycle of the tone, repeated back to back.
    let period = (args.sample_rate / args.tone_hz).round() as usize;
    let buffer: Vec<Complex<f32>> = (0..period.max(1))
        .map(|n| {
            let phase = TAU * args.tone_hz as f32 * n as f32 / args.sample_rate as f32;
            Complex::new(phase.cos(), phase.sin()) * 0.7
        })
        .collect();

    let meta = StreamMeta::default();
    let started = Instant::now();
    let mut sent: u64 = 0;

    while started.elapsed().as_secs_f64() < args.duration_secs {
        sent += stream.send(&buffer, &meta, Duration::from_millis(1000))? as u64;
    }

    let status = stream.status()?;
    eprintln!(
        "Sent {} samples, underrun: {}, link rate: {:.1} MB/s",
        sent,
        status.underrun,
        status.link_rate / 1e6
    );

    stream.stop()?;
    Ok(())
}
