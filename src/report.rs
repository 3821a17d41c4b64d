use std::fmt;

use crate::decoder::{AdElement, DecodeStatus, DecodedAdvertisement, ElementData};
use crate::flags::FlagBit;
use crate::payload::AdvertisementPayload;

const RULE: &str = "--------------------------------------------------";

/// Human-readable listing of a decoded advertisement.
pub struct Report<'a> {
    payload: &'a AdvertisementPayload,
    decoded: &'a DecodedAdvertisement,
}

impl<'a> Report<'a> {
    pub fn new(payload: &'a AdvertisementPayload, decoded: &'a DecodedAdvertisement) -> Self {
        Self { payload, decoded }
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Decoding ADV Data: {}", self.payload)?;
        writeln!(f, "{}", RULE)?;

        for element in &self.decoded.elements {
            writeln!(f)?;
            write_element(f, element)?;
        }

        writeln!(f)?;
        writeln!(f, "{}", RULE)?;
        match self.decoded.status {
            DecodeStatus::Complete => write!(
                f,
                "Status: complete ({} of {} bytes decoded)",
                self.decoded.consumed,
                self.payload.len()
            ),
            DecodeStatus::Truncated {
                offset,
                declared_length,
                unparsed,
            } => write!(
                f,
                "Status: truncated at offset {} (declared length {}, {} byte(s) unparsed)",
                offset, declared_length, unparsed
            ),
        }
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, element: &AdElement) -> fmt::Result {
    writeln!(f, "Data Object {}:", element.index)?;
    writeln!(f, "Length: {}", element.length)?;
    writeln!(f, "Type: 0x{:02X} ({})", element.type_code, element.type_label)?;

    match &element.data {
        ElementData::Flags(flags) => {
            writeln!(f, "Flags:")?;
            for bit in flags.matched() {
                writeln!(f, "   - {}", FlagBit::label(bit))?;
            }
            writeln!(f, "Device Type Inferred: {}", flags.inferred_mode())
        }
        ElementData::MalformedFlags => writeln!(f, "Malformed Flags"),
        ElementData::Manufacturer(data) => {
            writeln!(
                f,
                "Company Identifier: 0x{:04X} ({})",
                data.company_id, data.company_name
            )?;
            writeln!(f, "Manufacturer Data: {}", data.data_hex())
        }
        ElementData::MalformedManufacturer => writeln!(f, "Malformed Manufacturer Specific Data"),
        ElementData::Raw => {
            writeln!(f, "Raw Data: 0x{}", element.payload_hex())?;
            if let Some(uuids) = element.service_uuids() {
                for uuid in uuids {
                    writeln!(f, "   - Service {}", uuid)?;
                }
            }
            if let Some(name) = element.local_name() {
                writeln!(f, "Name: {}", name)?;
            }
            if !element.known_type {
                writeln!(f, "Unable to decode this type.")?;
            }
            Ok(())
        }
    }
}
