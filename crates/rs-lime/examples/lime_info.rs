//! Simple CLI tool to discover and query LimeSDR devices.
//!
//! Prints the connection string, board identification, and chip
//! temperature of every connected device.

use rs_lime::{enumerate_devices, library_version, LimeDevice};
use std::process;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    match run() {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nTroubleshooting:");
            eprintln!("- Check that LimeSuite is installed (LimeUtil --find)");
            eprintln!("- Check USB permissions (udev rules on Linux)");
            process::exit(1);
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(version) = library_version() {
        println!("LimeSuite library version: {}", version);
    }

    println!("Scanning for LimeSDR devices...\n");

    let devices = enumerate_devices()?;

    if devices.is_empty() {
        println!("No LimeSDR devices found.");
        return Ok(());
    }

    for (i, dev) in devices.iter().enumerate() {
        println!("Device {}: {}", i, dev.raw);

        let device = LimeDevice::open(dev)?;
        let info = device.device_info()?;

        println!("  Firmware version: {}", info.firmware_version);
        println!("  Hardware version: {}", info.hardware_version);
        println!("  Gateware version: {}", info.gateware_version);
        println!("  Gateware target:  {}", info.gateware_target_board);
        println!("  Serial number:    {:016X}", info.board_serial_number);

        match device.chip_temperature() {
            Ok(temp) => println!("  Chip temperature: {:.1} C", temp),
            Err(e) => println!("  Chip temperature: unavailable ({})", e),
        }

        println!();
    }

    Ok(())
}
