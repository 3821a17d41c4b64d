use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use bleprobe::{
    AdDecoder, AdvertisementPayload, Device, Error, Report, Result, ScanConfig, Scanner,
    DEFAULT_BAUD_RATE, DEFAULT_PORT,
};
use clap::{Parser, Subcommand};
use futures::StreamExt;

/// Discover BLE devices through an AT-command radio and decode their advertisements
#[derive(Parser, Debug)]
#[command(name = "bleprobe", version, long_about = None)]
struct Args {
    /// Serial port the radio module is attached to
    #[arg(short, long, default_value = DEFAULT_PORT)]
    port: String,

    /// Serial baud rate
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Scan duration in seconds, for discovery and for the target scan
    #[arg(short, long, default_value_t = 3)]
    duration: u64,

    /// Enable verbose logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan for devices, pick one and decode its advertisement (default)
    Scan,
    /// Decode an advertisement given as a hex string
    Decode {
        /// Advertisement payload, e.g. 02010603030D18020A09
        hex: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    });
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    let result = match &args.command {
        Some(Command::Decode { hex }) => decode(hex),
        Some(Command::Scan) | None => scan(&args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn decode(hex: &str) -> Result<()> {
    let payload = AdvertisementPayload::from_hex(hex)?;
    print_report(&payload);
    Ok(())
}

async fn scan(args: &Args) -> Result<()> {
    let duration = Duration::from_secs(args.duration);
    let config = ScanConfig::default()
        .port(args.port.as_str())
        .baud_rate(args.baud)
        .scan_duration(duration)
        .target_scan_duration(duration);

    let mut scanner = Scanner::new();
    let device_stream = scanner.device_stream();

    println!("\nStarting BLE scan for {} seconds...\n", args.duration);
    scanner.start(config).await?;

    let devices: Vec<Device> = device_stream.collect().await;
    if devices.is_empty() {
        println!("No devices found.");
        return Ok(());
    }

    println!("Select a device to scan further:");
    for (idx, device) in devices.iter().enumerate() {
        println!("[{}] {}", idx, device.info());
    }

    print!("Enter device number (e.g. 0): ");
    io::stdout().flush()?;
    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;

    let device = select(&devices, &choice)?;

    println!(
        "\nScanning target device {} for {} seconds...\n",
        device.mac(),
        args.duration
    );
    match device.advertisement().await {
        Ok(payload) => print_report(&payload),
        Err(Error::NoAdvertisementData { .. }) => println!("No ADV data found to decode."),
        Err(e) => return Err(e),
    }

    Ok(())
}

fn print_report(payload: &AdvertisementPayload) {
    let decoded = AdDecoder::default().decode(payload);
    println!("{}", Report::new(payload, &decoded));
}

/// Picks the entry numbered by `choice`, a zero-based index typed by the user.
fn select<'a, T>(items: &'a [T], choice: &str) -> Result<&'a T> {
    let choice = choice.trim();

    choice
        .parse::<usize>()
        .ok()
        .and_then(|index| items.get(index))
        .ok_or_else(|| Error::InvalidSelection(choice.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_by_index() {
        let items = ["a", "b", "c"];
        assert_eq!(select(&items, "1\n").unwrap(), &"b");
        assert_eq!(select(&items, " 0 ").unwrap(), &"a");
    }

    #[test]
    fn select_rejects_bad_input() {
        let items = ["a"];
        assert!(matches!(select(&items, "1"), Err(Error::InvalidSelection(c)) if c == "1"));
        assert!(matches!(select(&items, "x"), Err(Error::InvalidSelection(_))));
        assert!(matches!(select(&items, "-1"), Err(Error::InvalidSelection(_))));
        assert!(matches!(select::<&str>(&[], ""), Err(Error::InvalidSelection(_))));
    }

    #[test]
    fn args_default_to_scan() {
        let args = Args::parse_from(["bleprobe", "--port", "/dev/ttyACM0"]);
        assert_eq!(args.port, "/dev/ttyACM0");
        assert_eq!(args.baud, DEFAULT_BAUD_RATE);
        assert_eq!(args.duration, 3);
        assert!(args.command.is_none());
    }

    #[test]
    fn args_decode() {
        let args = Args::parse_from(["bleprobe", "-v", "decode", "020106"]);
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Command::Decode { ref hex }) if hex == "020106"));
    }
}
