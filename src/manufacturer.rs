//! Manufacturer Specific Data (AD type 0xFF).

use std::borrow::Cow;
use std::collections::HashMap;

use crate::payload::to_hex;

/// A few widely deployed company identifiers from the Bluetooth SIG list.
pub const DEFAULT_COMPANIES: &[(u16, &str)] = &[
    (0x0000, "Ericsson Technology Licensing"),
    (0x0002, "Intel Corp."),
    (0x0006, "Microsoft"),
    (0x000A, "Qualcomm Technologies International, Ltd. (QTIL)"),
    (0x000D, "Texas Instruments Inc."),
    (0x000F, "Broadcom Corporation"),
    (0x004C, "Apple, Inc."),
    (0x0059, "Nordic Semiconductor ASA"),
    (0x0075, "Samsung Electronics Co. Ltd."),
    (0x0087, "Garmin International, Inc."),
    (0x00E0, "Google"),
    (0x0157, "Anhui Huami Information Technology Co., Ltd."),
    (0x0171, "Amazon.com Services, LLC"),
    (0x02E5, "Espressif Systems (Shanghai) Co., Ltd."),
    (0x038F, "Xiaomi Inc."),
    (0x0499, "Ruuvi Innovations Ltd."),
    (0x0822, "Adafruit Industries"),
];

/// Immutable mapping from 16-bit company identifier to company name.
#[derive(Debug, Clone)]
pub struct CompanyRegistry {
    names: HashMap<u16, Cow<'static, str>>,
}

impl Default for CompanyRegistry {
    fn default() -> Self {
        Self::from_table(DEFAULT_COMPANIES.iter().copied())
    }
}

impl CompanyRegistry {
    pub fn from_table<I, S>(table: I) -> Self
    where
        I: IntoIterator<Item = (u16, S)>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            names: table
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
        }
    }

    pub fn name(&self, company_id: u16) -> Option<&str> {
        self.names.get(&company_id).map(|name| name.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManufacturerData {
    pub company_id: u16,
    /// Resolved name, `"Unknown"` when the identifier is not in the registry.
    pub company_name: String,
    /// Bytes after the company identifier, possibly empty.
    pub data: Vec<u8>,
}

impl ManufacturerData {
    /// Splits a payload into its little-endian company identifier and the
    /// trailing bytes. Payloads shorter than two bytes are malformed.
    pub fn split(payload: &[u8]) -> Option<(u16, &[u8])> {
        match payload {
            [lo, hi, rest @ ..] => Some((u16::from_le_bytes([*lo, *hi]), rest)),
            _ => None,
        }
    }

    pub fn parse(payload: &[u8], companies: &CompanyRegistry) -> Option<Self> {
        let (company_id, data) = Self::split(payload)?;

        Some(Self {
            company_id,
            company_name: companies.name(company_id).unwrap_or("Unknown").to_owned(),
            data: data.to_vec(),
        })
    }

    pub fn data_hex(&self) -> String {
        to_hex(&self.data)
    }
}
