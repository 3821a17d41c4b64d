//! Labels for the one-byte AD type codes of legacy advertising data.

use std::borrow::Cow;
use std::collections::HashMap;

pub const FLAGS: u8 = 0x01;
pub const INCOMPLETE_16_SERVICE_LIST: u8 = 0x02;
pub const COMPLETE_16_SERVICE_LIST: u8 = 0x03;
pub const SHORT_NAME: u8 = 0x08;
pub const FULL_NAME: u8 = 0x09;
pub const TX_POWER_LEVEL: u8 = 0x0A;
pub const SERVICE_DATA_16: u8 = 0x16;
pub const MANUFACTURER_SPECIFIC_DATA: u8 = 0xFF;

/// Assigned-number labels used when no custom table is supplied.
pub const DEFAULT_AD_TYPES: &[(u8, &str)] = &[
    (FLAGS, "Flags"),
    (INCOMPLETE_16_SERVICE_LIST, "Incomplete 16-bit UUIDs"),
    (COMPLETE_16_SERVICE_LIST, "Complete 16-bit UUIDs"),
    (0x04, "Incomplete 32-bit UUIDs"),
    (0x05, "Complete 32-bit UUIDs"),
    (0x06, "Incomplete 128-bit UUIDs"),
    (0x07, "Complete 128-bit UUIDs"),
    (SHORT_NAME, "Shortened Local Name"),
    (FULL_NAME, "Complete Local Name"),
    (TX_POWER_LEVEL, "TX Power Level"),
    (0x0D, "Class of Device"),
    (0x12, "Peripheral Connection Interval Range"),
    (0x14, "16-bit Service Solicitation UUIDs"),
    (0x15, "128-bit Service Solicitation UUIDs"),
    (SERVICE_DATA_16, "Service Data"),
    (0x17, "Public Target Address"),
    (0x18, "Random Target Address"),
    (0x19, "Appearance"),
    (0x1A, "Advertising Interval"),
    (0x1B, "LE Bluetooth Device Address"),
    (0x1C, "LE Role"),
    (0x1F, "32-bit Service Solicitation UUIDs"),
    (0x20, "Service Data - 32-bit UUID"),
    (0x21, "Service Data - 128-bit UUID"),
    (0x24, "URI"),
    (0x27, "LE Supported Features"),
    (MANUFACTURER_SPECIFIC_DATA, "Manufacturer Specific Data"),
];

/// Immutable mapping from AD type code to a display label.
#[derive(Debug, Clone)]
pub struct AdTypeRegistry {
    labels: HashMap<u8, Cow<'static, str>>,
}

impl Default for AdTypeRegistry {
    fn default() -> Self {
        Self::from_table(DEFAULT_AD_TYPES.iter().copied())
    }
}

impl AdTypeRegistry {
    pub fn from_table<I, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            labels: table
                .into_iter()
                .map(|(code, label)| (code, label.into()))
                .collect(),
        }
    }

    pub fn is_known(&self, type_code: u8) -> bool {
        self.labels.contains_key(&type_code)
    }

    /// Label for `type_code`. Codes missing from the table get a label
    /// carrying the code itself, e.g. `Unknown (0x2A)`.
    pub fn label(&self, type_code: u8) -> Cow<'_, str> {
        match self.labels.get(&type_code) {
            Some(label) => Cow::Borrowed(label.as_ref()),
            None => Cow::Owned(format!("Unknown (0x{:02X})", type_code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels() {
        let registry = AdTypeRegistry::default();
        assert_eq!(registry.label(FLAGS), "Flags");
        assert_eq!(registry.label(TX_POWER_LEVEL), "TX Power Level");
        assert_eq!(
            registry.label(MANUFACTURER_SPECIFIC_DATA),
            "Manufacturer Specific Data"
        );
    }

    #[test]
    fn unknown_code_embeds_hex() {
        let registry = AdTypeRegistry::default();
        assert!(!registry.is_known(0x2A));
        assert_eq!(registry.label(0x2A), "Unknown (0x2A)");
    }

    #[test]
    fn custom_table_replaces_defaults() {
        let registry = AdTypeRegistry::from_table(vec![(0x01, String::from("Flag byte"))]);
        assert_eq!(registry.label(0x01), "Flag byte");
        assert_eq!(registry.label(0x09), "Unknown (0x09)");
    }
}
