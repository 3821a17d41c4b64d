//! AT command set of the radio module and parsers for its console output.

use std::fmt;
use std::time::Duration;

use crate::device::DiscoveredDevice;

/// Marker preceding the advertisement hex dump in a target scan response.
pub const ADVERTISEMENT_MARKER: &str = "Device Data [ADV]:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtCommand {
    /// Put the module in central + peripheral role so it can scan.
    Dual,
    /// Scan for any advertiser for the given number of seconds.
    GapScan { seconds: u64 },
    /// Scan for one advertiser and dump its advertisement data.
    ScanTarget {
        address_type: Option<u8>,
        mac: String,
        seconds: u64,
    },
}

impl AtCommand {
    pub fn gap_scan(duration: Duration) -> Self {
        AtCommand::GapScan {
            seconds: whole_seconds(duration),
        }
    }

    pub fn scan_target(device: &DiscoveredDevice, duration: Duration) -> Self {
        AtCommand::ScanTarget {
            address_type: device.address_type,
            mac: device.mac.clone(),
            seconds: whole_seconds(duration),
        }
    }
}

/// The module takes whole seconds; partial seconds round up.
fn whole_seconds(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Dual => f.write_str("AT+DUAL"),
            AtCommand::GapScan { seconds } => write!(f, "AT+GAPSCAN={}", seconds),
            AtCommand::ScanTarget {
                address_type: Some(address_type),
                mac,
                seconds,
            } => write!(f, "AT+SCANTARGET=[{}]{}={}", address_type, mac, seconds),
            AtCommand::ScanTarget {
                address_type: None,
                mac,
                seconds,
            } => write!(f, "AT+SCANTARGET={}={}", mac, seconds),
        }
    }
}

/// Parses one scan result line such as
/// `[3] Device: [1]C4:2F:90:11:22:33  RSSI: -61 (Thermo)`.
///
/// The bracketed address type and the parenthesized name are optional.
/// Lines in any other shape yield `None`.
pub fn parse_device_line(line: &str) -> Option<DiscoveredDevice> {
    let (index, rest) = line.strip_prefix('[')?.split_once(']')?;
    if !is_decimal(index) {
        return None;
    }

    let rest = rest.strip_prefix(" Device: ")?;
    let (address_type, rest) = match rest.strip_prefix('[') {
        Some(bracketed) => {
            let (address_type, rest) = bracketed.split_once(']')?;
            if address_type.len() != 1 || !is_decimal(address_type) {
                return None;
            }
            (Some(address_type.parse().ok()?), rest)
        }
        None => (None, rest),
    };

    let mac = rest.get(..17)?;
    if !mac
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b) || b == b':')
    {
        return None;
    }

    let rest = rest[17..].strip_prefix(char::is_whitespace)?.trim_start();
    let (rssi, rest) = split_signed(rest.strip_prefix("RSSI:")?.trim_start())?;

    let name = rest
        .strip_prefix(char::is_whitespace)
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.split_once(')'))
        .map(|(name, _)| name)
        .filter(|name| !name.is_empty())
        .map(str::to_owned);

    DiscoveredDevice::new(address_type, mac, rssi, name).ok()
}

/// Hex payload following [`ADVERTISEMENT_MARKER`], if the line carries one.
pub fn parse_advertisement_line(line: &str) -> Option<&str> {
    let (_, payload) = line.split_once(ADVERTISEMENT_MARKER)?;
    let payload = payload.trim();

    if payload.is_empty() || payload.contains(ADVERTISEMENT_MARKER) {
        None
    } else {
        Some(payload)
    }
}

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Splits a leading `-?\d+` off `s`. The value is `None` if it overflows.
fn split_signed(s: &str) -> Option<(Option<i16>, &str)> {
    let digits_start = usize::from(s.starts_with('-'));
    let digits = s[digits_start..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }

    let (number, rest) = s.split_at(digits_start + digits);
    Some((number.parse().ok(), rest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_text() {
        assert_eq!(AtCommand::Dual.to_string(), "AT+DUAL");
        assert_eq!(AtCommand::GapScan { seconds: 3 }.to_string(), "AT+GAPSCAN=3");
        assert_eq!(
            AtCommand::ScanTarget {
                address_type: Some(1),
                mac: "C4:2F:90:11:22:33".into(),
                seconds: 5,
            }
            .to_string(),
            "AT+SCANTARGET=[1]C4:2F:90:11:22:33=5"
        );
        assert_eq!(
            AtCommand::ScanTarget {
                address_type: None,
                mac: "C4:2F:90:11:22:33".into(),
                seconds: 3,
            }
            .to_string(),
            "AT+SCANTARGET=C4:2F:90:11:22:33=3"
        );
    }

    #[test]
    fn durations_round_up() {
        assert_eq!(AtCommand::gap_scan(Duration::from_secs(3)), AtCommand::GapScan { seconds: 3 });
        assert_eq!(
            AtCommand::gap_scan(Duration::from_millis(100)),
            AtCommand::GapScan { seconds: 1 }
        );

        let device = DiscoveredDevice::new(Some(0), "00:1A:7D:DA:71:13", None, None).unwrap();
        assert_eq!(
            AtCommand::scan_target(&device, Duration::from_millis(2500)).to_string(),
            "AT+SCANTARGET=[0]00:1A:7D:DA:71:13=3"
        );
    }

    #[test]
    fn device_line_with_type_and_name() {
        let device = parse_device_line("[3] Device: [1]C4:2F:90:11:22:33  RSSI: -61 (Thermo Sensor)").unwrap();
        assert_eq!(device.address_type, Some(1));
        assert_eq!(device.mac, "C4:2F:90:11:22:33");
        assert_eq!(device.rssi, Some(-61));
        assert_eq!(device.name.as_deref(), Some("Thermo Sensor"));
    }

    #[test]
    fn device_line_without_name() {
        let device = parse_device_line("[0] Device: [0]00:1A:7D:DA:71:13 RSSI:-90").unwrap();
        assert_eq!(device.address_type, Some(0));
        assert_eq!(device.rssi, Some(-90));
        assert_eq!(device.name, None);
    }

    #[test]
    fn device_line_without_address_type() {
        let device = parse_device_line("[12] Device: 00:1A:7D:DA:71:13 RSSI: -47 (Tag)").unwrap();
        assert_eq!(device.address_type, None);
        assert_eq!(device.mac, "00:1A:7D:DA:71:13");
        assert_eq!(device.name.as_deref(), Some("Tag"));
    }

    #[test]
    fn name_stops_at_first_closing_paren() {
        let device = parse_device_line("[1] Device: [1]00:1A:7D:DA:71:13 RSSI: -47 (a) b)").unwrap();
        assert_eq!(device.name.as_deref(), Some("a"));
    }

    #[test]
    fn rejects_other_lines() {
        for line in [
            "OK",
            "",
            "Device Data [ADV]: 020106",
            "[x] Device: [1]00:1A:7D:DA:71:13 RSSI: -47",
            "[1] Device: [12]00:1A:7D:DA:71:13 RSSI: -47",
            "[1] Device: [1]00:1a:7d:da:71:13 RSSI: -47",
            "[1] Device: [1]00:1A:7D:DA:71:13RSSI: -47",
            "[1] Device: [1]00:1A:7D:DA:71 RSSI: -47",
            "[1] Device: [1]00:1A:7D:DA:71:13 RSSI: n/a",
        ] {
            assert!(parse_device_line(line).is_none(), "accepted {:?}", line);
        }
    }

    #[test]
    fn advertisement_line() {
        assert_eq!(
            parse_advertisement_line("+SCANTARGET Device Data [ADV]: 02010603030D18 "),
            Some("02010603030D18")
        );
        assert_eq!(parse_advertisement_line("Device Data [ADV]:"), None);
        assert_eq!(parse_advertisement_line("Device Data [RSP]: 0409414243"), None);
    }
}
