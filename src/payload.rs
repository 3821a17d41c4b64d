use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use crate::{Error, Result};

/// Raw advertising data of one device, as reported by the radio.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdvertisementPayload(Vec<u8>);

impl AdvertisementPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parses a hex string such as `"02010603030D18"`. Whitespace between
    /// digits is ignored and both cases are accepted.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let mut bytes = Vec::with_capacity(hex.len() / 2);
        let mut high: Option<u8> = None;
        let mut last = 0;

        for (position, c) in hex.char_indices() {
            if c.is_ascii_whitespace() {
                continue;
            }
            let nibble = c
                .to_digit(16)
                .ok_or(Error::InvalidHex { position })? as u8;
            last = position;

            match high.take() {
                Some(h) => bytes.push(h << 4 | nibble),
                None => high = Some(nibble),
            }
        }

        if high.is_some() {
            return Err(Error::InvalidHex { position: last });
        }

        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl FromStr for AdvertisementPayload {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for AdvertisementPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AdvertisementPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0).to_uppercase())
    }
}

/// Lower-case hex without separators.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{:02x}", b);
        s
    })
}

/// Writes `[len][type][payload]` AD structures for each `(type_code, payload)`.
pub fn encode_elements<'a, I>(elements: I) -> Result<AdvertisementPayload>
where
    I: IntoIterator<Item = (u8, &'a [u8])>,
{
    let mut out = Vec::new();

    for (type_code, payload) in elements {
        let length = u8::try_from(payload.len() + 1)
            .map_err(|_| Error::ElementTooLong {
                type_code,
                len: payload.len(),
            })?;

        out.push(length);
        out.push(type_code);
        out.extend_from_slice(payload);
    }

    Ok(AdvertisementPayload(out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_and_whitespace() {
        let payload = AdvertisementPayload::from_hex("02 01 06 03030d18").unwrap();
        assert_eq!(payload.as_bytes(), [0x02, 0x01, 0x06, 0x03, 0x03, 0x0D, 0x18]);
        assert_eq!(payload.to_string(), "02010603030D18");
    }

    #[test]
    fn empty_string_is_empty_payload() {
        assert!(AdvertisementPayload::from_hex("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_hex_digit() {
        match AdvertisementPayload::from_hex("02zz") {
            Err(Error::InvalidHex { position }) => assert_eq!(position, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_odd_length() {
        match "020".parse::<AdvertisementPayload>() {
            Err(Error::InvalidHex { position }) => assert_eq!(position, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn encodes_structures() {
        let payload =
            encode_elements(vec![(0x01, &[0x06][..]), (0x0A, &[][..])]).unwrap();
        assert_eq!(payload.as_bytes(), [0x02, 0x01, 0x06, 0x01, 0x0A]);
    }

    #[test]
    fn rejects_oversized_structure() {
        let big = [0u8; 255];
        assert!(matches!(
            encode_elements(vec![(0xFF, &big[..])]),
            Err(Error::ElementTooLong { type_code: 0xFF, len: 255 })
        ));
        assert!(encode_elements(vec![(0xFF, &big[..254])]).is_ok());
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(to_hex(&[0x0D, 0x18, 0xAB]), "0d18ab");
        assert_eq!(to_hex(&[]), "");
    }
}
