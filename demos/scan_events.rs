//! This example listens for BLE device events from a radio module.

use bleprobe::{DeviceEvent, Error, ScanConfig, Scanner};
use futures::StreamExt;
use tokio::time::{sleep, Duration};

#[tokio::main]
async fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let port = std::env::args().nth(1).unwrap_or_else(|| bleprobe::DEFAULT_PORT.to_owned());

    // Create a new BLE device scanner
    let mut scanner = Scanner::new();

    // Create a stream that is provided with device events
    let mut event_stream = scanner.device_event_stream();

    // Start the scanner on the given serial port
    scanner
        .start(ScanConfig::default().port(port).scan_duration(Duration::from_secs(5)))
        .await?;

    // Read events in a separate task
    let join_handle = tokio::spawn(async move {
        while let Some(event) = event_stream.next().await {
            match event {
                DeviceEvent::Discovered(device) => {
                    println!("Device discovered: {}", device.info())
                }
                DeviceEvent::Updated(device) => {
                    println!("Device updated: {} RSSI {:?}", device.mac(), device.rssi())
                }
            }
        }
    });

    sleep(Duration::from_millis(4000)).await;

    scanner.stop().await?;

    join_handle.await.unwrap();

    Ok(())
}
