use btleplug::api::ParseBDAddrError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The advertisement string is not an even-length sequence of hex digits.
    #[error("invalid hex payload at character {position}")]
    InvalidHex { position: usize },

    #[error("invalid device address: {0}")]
    InvalidAddress(#[from] ParseBDAddrError),

    /// An AD structure payload must fit in a single length byte.
    #[error("AD structure 0x{type_code:02X} payload of {len} bytes does not fit in one element")]
    ElementTooLong { type_code: u8, len: usize },

    #[error("no advertisement data received from {mac}")]
    NoAdvertisementData { mac: String },

    #[error("invalid selection: {0:?}")]
    InvalidSelection(String),
}
