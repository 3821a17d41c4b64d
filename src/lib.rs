//! BLE discovery through an AT-command serial radio, and a decoder for the
//! advertisement data it reports.
//!
//! The decoder is synchronous and has no I/O; it can be used on its own with
//! any advertisement bytes. The scanner drives a radio module that answers
//! `AT+GAPSCAN` and `AT+SCANTARGET` over a serial line.
//!
//! ## Usage
//!
//! Decoding an advertisement:
//!
//! ```rust
//! use bleprobe::{AdDecoder, AdvertisementPayload, DeviceMode, ElementData};
//!
//! let payload = AdvertisementPayload::from_hex("02010603030D18020A09").unwrap();
//! let decoded = AdDecoder::default().decode(&payload);
//!
//! assert_eq!(decoded.elements.len(), 3);
//! assert!(decoded.status.is_complete());
//! match &decoded.elements[0].data {
//!     ElementData::Flags(flags) => assert_eq!(flags.inferred_mode(), DeviceMode::LeOnly),
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```
//!
//! Scanning for devices and fetching the advertisement of the first one:
//!
//! ```rust,no_run
//! use bleprobe::{AdDecoder, Error, Report, ScanConfig, Scanner};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     pretty_env_logger::init();
//!
//!     let config = ScanConfig::default()
//!         .port("/dev/ttyACM0")
//!         .require_name()
//!         .stop_after_first_match();
//!
//!     let mut scanner = Scanner::new();
//!     let mut devices = scanner.device_stream();
//!     scanner.start(config).await?;
//!
//!     let device = devices.next().await.unwrap();
//!     let payload = device.advertisement().await?;
//!     let decoded = AdDecoder::default().decode(&payload);
//!     println!("{}", Report::new(&payload, &decoded));
//!
//!     Ok(())
//! }
//!```

#![warn(clippy::all, future_incompatible, nonstandard_style, rust_2018_idioms)]

pub use btleplug::api::BDAddr;

pub use ad_type::AdTypeRegistry;
pub use decoder::{AdDecoder, AdElement, AdElements, DecodeStatus, DecodedAdvertisement, ElementData};
pub use device::{Device, DeviceEvent, DiscoveredDevice};
pub use error::{Error, Result};
pub use flags::{DeviceMode, FlagBit, Flags};
pub use manufacturer::{CompanyRegistry, ManufacturerData};
pub use payload::{encode_elements, to_hex, AdvertisementPayload};
pub use report::Report;
pub use scanner::{ScanConfig, Scanner, DEFAULT_BAUD_RATE, DEFAULT_PORT};
pub use transport::{AtPort, RadioLink};

mod device;
mod error;
mod report;
mod scanner;
mod transport;

pub mod ad_type;
pub mod at;
pub mod decoder;
pub mod flags;
pub mod manufacturer;
pub mod payload;
