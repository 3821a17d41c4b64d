use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::BDAddr;
use tokio::time::Instant;

use crate::at::{parse_advertisement_line, AtCommand};
use crate::payload::AdvertisementPayload;
use crate::scanner::Session;
use crate::{Error, Result};

/// One advertiser reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// 0 for public, 1 for random addresses. Absent on firmware that does
    /// not print it.
    pub address_type: Option<u8>,
    pub address: BDAddr,
    /// Colon-delimited upper-case form of `address`, as the radio prints it.
    pub mac: String,
    pub rssi: Option<i16>,
    pub name: Option<String>,
}

impl DiscoveredDevice {
    pub fn new(
        address_type: Option<u8>,
        mac: &str,
        rssi: Option<i16>,
        name: Option<String>,
    ) -> Result<Self> {
        let mac = mac.to_ascii_uppercase();

        Ok(Self {
            address_type,
            address: mac.parse()?,
            mac,
            rssi,
            name,
        })
    }
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.mac, name),
            None => f.write_str(&self.mac),
        }
    }
}

/// A discovered device bound to the radio that found it.
#[derive(Debug, Clone)]
pub struct Device {
    session: Arc<Session>,
    info: DiscoveredDevice,
}

impl Device {
    pub(crate) fn new(session: Arc<Session>, info: DiscoveredDevice) -> Self {
        Self { session, info }
    }

    #[inline]
    pub fn info(&self) -> &DiscoveredDevice {
        &self.info
    }

    #[inline]
    pub fn address(&self) -> BDAddr {
        self.info.address
    }

    #[inline]
    pub fn mac(&self) -> &str {
        &self.info.mac
    }

    /// Signal strength at the last sighting
    #[inline]
    pub fn rssi(&self) -> Option<i16> {
        self.info.rssi
    }

    /// Local name of the device
    #[inline]
    pub fn local_name(&self) -> Option<&str> {
        self.info.name.as_deref()
    }

    /// Advertisement data of the device, using the target scan duration of
    /// the scan configuration.
    pub async fn advertisement(&self) -> Result<AdvertisementPayload> {
        self.advertisement_for(self.session.target_scan_duration)
            .await
    }

    /// Runs a target scan for `duration` and returns the first advertisement
    /// the radio dumps. Waits for a running discovery scan to release the
    /// radio first.
    pub async fn advertisement_for(&self, duration: Duration) -> Result<AdvertisementPayload> {
        let mut port = self.session.port.lock().await;

        log::info!("Scanning target device {}", self.info);

        port.send(&AtCommand::scan_target(&self.info, duration))
            .await?;

        let deadline = Instant::now() + duration + self.session.response_grace;
        let mut advertisement = None;

        // Drain the whole response so the next command starts on a quiet line.
        while let Some(line) = port.read_line_until(deadline).await? {
            if advertisement.is_none() {
                advertisement = parse_advertisement_line(&line).map(str::to_owned);
            }
        }

        match advertisement {
            Some(hex) => AdvertisementPayload::from_hex(&hex),
            None => Err(Error::NoAdvertisementData {
                mac: self.info.mac.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// First sighting of a device that passed the scan filters.
    Discovered(Device),
    /// Later sighting of a discovered device.
    Updated(Device),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_mac_case() {
        let device = DiscoveredDevice::new(Some(1), "c4:2f:90:11:22:33", Some(-40), None).unwrap();
        assert_eq!(device.mac, "C4:2F:90:11:22:33");
        assert_eq!(device.address, "C4:2F:90:11:22:33".parse::<BDAddr>().unwrap());
    }

    #[test]
    fn rejects_malformed_mac() {
        assert!(matches!(
            DiscoveredDevice::new(None, "C4:2F:90:11:22", None, None),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn display_includes_name() {
        let named = DiscoveredDevice::new(None, "C4:2F:90:11:22:33", None, Some("Thermo".into())).unwrap();
        assert_eq!(named.to_string(), "C4:2F:90:11:22:33 (Thermo)");

        let anonymous = DiscoveredDevice::new(None, "C4:2F:90:11:22:33", None, None).unwrap();
        assert_eq!(anonymous.to_string(), "C4:2F:90:11:22:33");
    }
}
