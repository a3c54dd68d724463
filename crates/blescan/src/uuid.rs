//! Bluetooth UUIDs
//!
//! Advertisements carry service UUIDs in three widths. All of them are
//! normalized to a single 128-bit value so callers compare one type.

use std::fmt;
use std::str::FromStr;

/// The Bluetooth Base UUID, `00000000-0000-1000-8000-00805F9B34FB`.
const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5F9B_34FB;

/// Mask of the low 96 bits shared by every SIG-assigned short UUID.
const BASE_MASK: u128 = (1u128 << 96) - 1;

/// A 128-bit Bluetooth UUID.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Uuid(u128);

impl Uuid {
    pub const fn from_u128(value: u128) -> Self {
        Uuid(value)
    }

    /// Expands a 16-bit SIG-assigned value against the Base UUID.
    pub const fn from_u16(value: u16) -> Self {
        Uuid::from_u32(value as u32)
    }

    /// Expands a 32-bit SIG-assigned value against the Base UUID.
    pub const fn from_u32(value: u32) -> Self {
        Uuid(((value as u128) << 96) | BASE_UUID)
    }

    /// Builds a UUID from 16 bytes in over-the-air (little-endian) order.
    pub const fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Uuid(u128::from_le_bytes(bytes))
    }

    /// Decodes a little-endian UUID of 2, 4 or 16 bytes.
    pub fn try_from_slice_le(slice: &[u8]) -> Option<Self> {
        match *slice {
            [a, b] => Some(Uuid::from_u16(u16::from_le_bytes([a, b]))),
            [a, b, c, d] => Some(Uuid::from_u32(u32::from_le_bytes([a, b, c, d]))),
            _ => {
                let bytes: [u8; 16] = slice.try_into().ok()?;
                Some(Uuid::from_bytes_le(bytes))
            }
        }
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub const fn to_bytes_le(&self) -> [u8; 16] {
        self.0.to_le_bytes()
    }

    fn is_sig_assigned(&self) -> bool {
        self.0 & BASE_MASK == BASE_UUID
    }

    /// The 32-bit short form, if this UUID is derived from the Base UUID.
    pub fn as_u32(&self) -> Option<u32> {
        self.is_sig_assigned().then(|| (self.0 >> 96) as u32)
    }

    /// The 16-bit short form, if this UUID has one.
    pub fn as_u16(&self) -> Option<u16> {
        self.as_u32().and_then(|v| u16::try_from(v).ok())
    }
}

impl From<u16> for Uuid {
    fn from(value: u16) -> Self {
        Uuid::from_u16(value)
    }
}

impl From<u32> for Uuid {
    fn from(value: u32) -> Self {
        Uuid::from_u32(value)
    }
}

impl PartialEq<u16> for Uuid {
    fn eq(&self, other: &u16) -> bool {
        self.as_u16() == Some(*other)
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_u16(), self.as_u32()) {
            (Some(short), _) => write!(f, "Uuid(0x{:04X})", short),
            (None, Some(short)) => write!(f, "Uuid(0x{:08X})", short),
            _ => write!(f, "Uuid({})", self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UuidParseError {
    #[error("UUID must have 4, 8 or 32 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex in UUID: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl FromStr for Uuid {
    type Err = UuidParseError;

    /// Accepts `180A`, `0000180A` or the hyphenated 128-bit form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| *c != '-').collect();
        let mut be = [0u8; 16];
        match digits.len() {
            4 => {
                hex::decode_to_slice(&digits, &mut be[..2])?;
                Ok(Uuid::from_u16(u16::from_be_bytes([be[0], be[1]])))
            }
            8 => {
                hex::decode_to_slice(&digits, &mut be[..4])?;
                Ok(Uuid::from_u32(u32::from_be_bytes([
                    be[0], be[1], be[2], be[3],
                ])))
            }
            32 => {
                hex::decode_to_slice(&digits, &mut be)?;
                Ok(Uuid(u128::from_be_bytes(be)))
            }
            n => Err(UuidParseError::InvalidLength(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_forms_expand_against_base() {
        let uuid = Uuid::from_u16(0x180F);
        assert_eq!(uuid.to_string(), "0000180f-0000-1000-8000-00805f9b34fb");
        assert_eq!(uuid.as_u16(), Some(0x180F));
        assert_eq!(uuid, 0x180Fu16);

        let uuid = Uuid::from_u32(0x1234_5678);
        assert_eq!(uuid.as_u16(), None);
        assert_eq!(uuid.as_u32(), Some(0x1234_5678));
    }

    #[test]
    fn test_slice_widths() {
        assert_eq!(
            Uuid::try_from_slice_le(&[0x0F, 0x18]),
            Some(Uuid::from_u16(0x180F))
        );
        assert_eq!(
            Uuid::try_from_slice_le(&[0x78, 0x56, 0x34, 0x12]),
            Some(Uuid::from_u32(0x1234_5678))
        );
        assert_eq!(Uuid::try_from_slice_le(&[1, 2, 3]), None);

        let mut le = [0u8; 16];
        for (i, b) in le.iter_mut().enumerate() {
            *b = i as u8;
        }
        let uuid = Uuid::try_from_slice_le(&le).unwrap();
        assert_eq!(uuid.to_bytes_le(), le);
        assert_eq!(uuid.as_u32(), None);
    }

    #[test]
    fn test_parse_and_display() {
        let text = "7309203e-349d-4c11-ac6b-baedd1819764";
        let uuid: Uuid = text.parse().unwrap();
        assert_eq!(uuid.to_string(), text);
        assert_eq!("180A".parse::<Uuid>().unwrap(), Uuid::from_u16(0x180A));
        assert_eq!(
            "12345678".parse::<Uuid>().unwrap(),
            Uuid::from_u32(0x1234_5678)
        );
        assert!(matches!(
            "123".parse::<Uuid>(),
            Err(UuidParseError::InvalidLength(3))
        ));
        assert!(matches!("zz0A".parse::<Uuid>(), Err(UuidParseError::Hex(_))));
    }

    #[test]
    fn test_debug_prefers_short_form() {
        assert_eq!(format!("{:?}", Uuid::from_u16(0x2A19)), "Uuid(0x2A19)");
        assert_eq!(
            format!("{:?}", Uuid::from_u32(0x0001_2A19)),
            "Uuid(0x00012A19)"
        );
    }
}
