//! Walks legacy advertising data one AD structure at a time.
//!
//! Each structure is `[length][type][payload; length - 1]`. A zero length ends
//! the data early, and a structure whose declared length runs past the end of
//! the buffer stops the walk with [`DecodeStatus::Truncated`]. Neither case is
//! an error: whatever was decoded before it remains valid.

use btleplug::api::bleuuid::uuid_from_u16;
use uuid::Uuid;

use crate::ad_type::{self, AdTypeRegistry};
use crate::flags::Flags;
use crate::manufacturer::{CompanyRegistry, ManufacturerData};
use crate::payload::{to_hex, AdvertisementPayload};

/// How a decode pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStatus {
    /// Hit a zero length byte or consumed the whole buffer.
    Complete,
    /// The structure at `offset` declares `declared_length` bytes, but only
    /// `unparsed - 1` follow its length byte.
    Truncated {
        offset: usize,
        declared_length: u8,
        unparsed: usize,
    },
}

impl DecodeStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, DecodeStatus::Complete)
    }
}

/// Type-specific interpretation of an element's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementData {
    Flags(Flags),
    /// Flags structure without a flags byte.
    MalformedFlags,
    Manufacturer(ManufacturerData),
    /// Manufacturer data too short to hold a company identifier.
    MalformedManufacturer,
    /// No structural interpretation; see [`AdElement::payload`].
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdElement {
    /// Position in the payload, starting at 1.
    pub index: usize,
    pub length: u8,
    pub type_code: u8,
    pub type_label: String,
    /// Whether the type code is listed in the decoder's type registry.
    pub known_type: bool,
    pub payload: Vec<u8>,
    pub data: ElementData,
}

impl AdElement {
    pub fn payload_hex(&self) -> String {
        to_hex(&self.payload)
    }

    /// Bytes this element occupies in the buffer, length byte included.
    pub fn encoded_len(&self) -> usize {
        self.length as usize + 1
    }

    /// 16-bit service UUIDs listed by an (in)complete service list structure.
    pub fn service_uuids(&self) -> Option<Vec<Uuid>> {
        match self.type_code {
            ad_type::INCOMPLETE_16_SERVICE_LIST | ad_type::COMPLETE_16_SERVICE_LIST => Some(
                self.payload
                    .chunks_exact(2)
                    .map(|pair| uuid_from_u16(u16::from_le_bytes([pair[0], pair[1]])))
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn local_name(&self) -> Option<String> {
        match self.type_code {
            ad_type::SHORT_NAME | ad_type::FULL_NAME => {
                Some(String::from_utf8_lossy(&self.payload).into_owned())
            }
            _ => None,
        }
    }
}

/// Decodes advertising data using injected label tables.
#[derive(Debug, Clone, Default)]
pub struct AdDecoder {
    ad_types: AdTypeRegistry,
    companies: CompanyRegistry,
}

impl AdDecoder {
    pub fn new(ad_types: AdTypeRegistry, companies: CompanyRegistry) -> Self {
        Self {
            ad_types,
            companies,
        }
    }

    /// Lazily walks `data`. Check [`AdElements::status`] once the iterator
    /// is exhausted to learn whether the buffer was truncated.
    pub fn elements<'a>(&'a self, data: &'a [u8]) -> AdElements<'a> {
        AdElements {
            decoder: self,
            data,
            cursor: 0,
            index: 0,
            status: None,
        }
    }

    pub fn decode(&self, payload: &AdvertisementPayload) -> DecodedAdvertisement {
        let mut walker = self.elements(payload.as_bytes());
        let elements: Vec<_> = walker.by_ref().collect();

        DecodedAdvertisement {
            elements,
            status: walker.status().unwrap_or(DecodeStatus::Complete),
            consumed: walker.consumed(),
        }
    }

    fn interpret(&self, type_code: u8, payload: &[u8]) -> ElementData {
        match type_code {
            ad_type::FLAGS => match Flags::from_payload(payload) {
                Some(flags) => ElementData::Flags(flags),
                None => {
                    log::warn!("Flags structure has no flags byte");
                    ElementData::MalformedFlags
                }
            },
            ad_type::MANUFACTURER_SPECIFIC_DATA => {
                match ManufacturerData::parse(payload, &self.companies) {
                    Some(data) => ElementData::Manufacturer(data),
                    None => {
                        log::warn!(
                            "Manufacturer data of {} byte(s) has no company identifier",
                            payload.len()
                        );
                        ElementData::MalformedManufacturer
                    }
                }
            }
            _ => ElementData::Raw,
        }
    }
}

/// Iterator over the AD structures of one buffer.
pub struct AdElements<'a> {
    decoder: &'a AdDecoder,
    data: &'a [u8],
    cursor: usize,
    index: usize,
    status: Option<DecodeStatus>,
}

impl AdElements<'_> {
    /// `None` while structures remain to be read.
    pub fn status(&self) -> Option<DecodeStatus> {
        self.status
    }

    /// Bytes covered by the elements emitted so far.
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    fn finish(&mut self, status: DecodeStatus) -> Option<AdElement> {
        self.status = Some(status);
        None
    }
}

impl Iterator for AdElements<'_> {
    type Item = AdElement;

    fn next(&mut self) -> Option<AdElement> {
        if self.status.is_some() {
            return None;
        }

        let cursor = self.cursor;
        let length = match self.data.get(cursor) {
            None | Some(0) => return self.finish(DecodeStatus::Complete),
            Some(length) => *length,
        };

        if cursor + length as usize >= self.data.len() {
            let unparsed = self.data.len() - cursor;
            log::warn!(
                "AD structure at offset {} declares {} byte(s) but only {} remain",
                cursor,
                length,
                unparsed - 1
            );
            return self.finish(DecodeStatus::Truncated {
                offset: cursor,
                declared_length: length,
                unparsed,
            });
        }

        let type_code = self.data[cursor + 1];
        let payload = &self.data[cursor + 2..cursor + 1 + length as usize];

        self.cursor += length as usize + 1;
        self.index += 1;

        log::trace!(
            "AD structure {} at offset {}: type 0x{:02X}, {} payload byte(s)",
            self.index,
            cursor,
            type_code,
            payload.len()
        );

        Some(AdElement {
            index: self.index,
            length,
            type_code,
            type_label: self.decoder.ad_types.label(type_code).into_owned(),
            known_type: self.decoder.ad_types.is_known(type_code),
            payload: payload.to_vec(),
            data: self.decoder.interpret(type_code, payload),
        })
    }
}

/// Result of one full decode pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAdvertisement {
    pub elements: Vec<AdElement>,
    pub status: DecodeStatus,
    /// Bytes covered by `elements`; never more than the buffer size.
    pub consumed: usize,
}

impl DecodedAdvertisement {
    pub fn flags(&self) -> Option<Flags> {
        self.elements.iter().find_map(|element| match element.data {
            ElementData::Flags(flags) => Some(flags),
            _ => None,
        })
    }

    pub fn manufacturer_data(&self) -> impl Iterator<Item = &ManufacturerData> {
        self.elements.iter().filter_map(|element| match &element.data {
            ElementData::Manufacturer(data) => Some(data),
            _ => None,
        })
    }

    /// The complete local name if advertised, otherwise the shortened one.
    pub fn local_name(&self) -> Option<String> {
        let by_type = |type_code| {
            self.elements
                .iter()
                .find(|element| element.type_code == type_code)
                .and_then(AdElement::local_name)
        };

        by_type(ad_type::FULL_NAME).or_else(|| by_type(ad_type::SHORT_NAME))
    }

    pub fn service_uuids(&self) -> Vec<Uuid> {
        self.elements
            .iter()
            .filter_map(AdElement::service_uuids)
            .flatten()
            .collect()
    }
}
