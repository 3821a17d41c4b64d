use std::fmt;

/// One named bit of the Flags AD structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagBit {
    LeLimitedDiscoverable,
    LeGeneralDiscoverable,
    BrEdrNotSupported,
    SimultaneousLeBrEdrController,
    SimultaneousLeBrEdrHost,
}

impl FlagBit {
    /// Every named bit in ascending bit order.
    pub const ALL: [FlagBit; 5] = [
        FlagBit::LeLimitedDiscoverable,
        FlagBit::LeGeneralDiscoverable,
        FlagBit::BrEdrNotSupported,
        FlagBit::SimultaneousLeBrEdrController,
        FlagBit::SimultaneousLeBrEdrHost,
    ];

    pub const fn mask(self) -> u8 {
        match self {
            FlagBit::LeLimitedDiscoverable => 0x01,
            FlagBit::LeGeneralDiscoverable => 0x02,
            FlagBit::BrEdrNotSupported => 0x04,
            FlagBit::SimultaneousLeBrEdrController => 0x08,
            FlagBit::SimultaneousLeBrEdrHost => 0x10,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FlagBit::LeLimitedDiscoverable => "LE Limited Discoverable Mode",
            FlagBit::LeGeneralDiscoverable => "LE General Discoverable Mode",
            FlagBit::BrEdrNotSupported => "BR/EDR Not Supported",
            FlagBit::SimultaneousLeBrEdrController => "Simultaneous LE and BR/EDR (Controller)",
            FlagBit::SimultaneousLeBrEdrHost => "Simultaneous LE and BR/EDR (Host)",
        }
    }
}

/// Coarse controller classification derived from the flags byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    LeOnly,
    DualMode,
    BrEdrOrUnknown,
}

impl fmt::Display for DeviceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceMode::LeOnly => "LE Only",
            DeviceMode::DualMode => "Dual Mode (LE + BR/EDR)",
            DeviceMode::BrEdrOrUnknown => "BR/EDR Only or Unknown",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Reads the first payload byte; the rest of the payload carries no meaning.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        payload.first().copied().map(Self)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn contains(self, bit: FlagBit) -> bool {
        self.0 & bit.mask() != 0
    }

    pub fn matched(self) -> impl Iterator<Item = FlagBit> {
        FlagBit::ALL
            .into_iter()
            .filter(move |bit| self.contains(*bit))
    }

    pub fn inferred_mode(self) -> DeviceMode {
        if self.contains(FlagBit::BrEdrNotSupported) {
            DeviceMode::LeOnly
        } else if self.contains(FlagBit::SimultaneousLeBrEdrController)
            || self.contains(FlagBit::SimultaneousLeBrEdrHost)
        {
            DeviceMode::DualMode
        } else {
            DeviceMode::BrEdrOrUnknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_discoverable_le_only() {
        let flags = Flags::new(0x06);
        let labels: Vec<_> = flags.matched().map(FlagBit::label).collect();
        assert_eq!(
            labels,
            ["LE General Discoverable Mode", "BR/EDR Not Supported"]
        );
        assert_eq!(flags.inferred_mode(), DeviceMode::LeOnly);
    }

    #[test]
    fn simultaneous_bits_are_dual_mode() {
        assert_eq!(Flags::new(0x18).inferred_mode(), DeviceMode::DualMode);
        assert_eq!(Flags::new(0x08).inferred_mode(), DeviceMode::DualMode);
        assert_eq!(Flags::new(0x12).inferred_mode(), DeviceMode::DualMode);
    }

    #[test]
    fn le_only_wins_over_dual_mode() {
        assert_eq!(Flags::new(0x1C).inferred_mode(), DeviceMode::LeOnly);
    }

    #[test]
    fn no_mode_bits() {
        assert_eq!(Flags::new(0x00).inferred_mode(), DeviceMode::BrEdrOrUnknown);
        assert_eq!(Flags::new(0x03).inferred_mode(), DeviceMode::BrEdrOrUnknown);
        assert_eq!(Flags::new(0x00).matched().count(), 0);
    }

    #[test]
    fn matched_order_is_ascending_bit_value() {
        let bits: Vec<_> = Flags::new(0x1F).matched().collect();
        assert_eq!(bits, FlagBit::ALL);
    }

    #[test]
    fn reserved_bits_are_ignored() {
        let flags = Flags::new(0xE2);
        assert_eq!(
            flags.matched().collect::<Vec<_>>(),
            [FlagBit::LeGeneralDiscoverable]
        );
    }

    #[test]
    fn payload_uses_first_byte() {
        assert_eq!(Flags::from_payload(&[0x06, 0xFF]), Some(Flags::new(0x06)));
        assert_eq!(Flags::from_payload(&[]), None);
    }
}
