//! SMC key encoding and value decoding

use std::fmt;

/// Four ASCII characters packed big-endian into a `u32`, as the SMC expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(u32);

impl FourCc {
    /// Encode a key such as `"TC0P"`; anything but exactly four ASCII bytes is rejected.
    pub fn from_key(key: &str) -> Option<Self> {
        let bytes: [u8; 4] = key.as_bytes().try_into().ok()?;
        if !bytes.is_ascii() {
            return None;
        }
        Some(Self(u32::from_be_bytes(bytes)))
    }

    pub fn from_u32(value: u32) -> Self {
        Self(value)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.to_bytes()))
    }
}

/// Signed 7.8 fixed point
pub const TYPE_SP78: [u8; 4] = *b"sp78";
/// Unsigned 14.2 fixed point
pub const TYPE_FPE2: [u8; 4] = *b"fpe2";
/// Big-endian IEEE-754 single
pub const TYPE_FLT: [u8; 4] = *b"flt ";

/// Decode an SMC reply payload according to its type tag.
///
/// Tags compare case-insensitively. Unknown tags and short payloads decode
/// to `None`.
pub fn decode(type_tag: [u8; 4], bytes: &[u8]) -> Option<f64> {
    let tag = type_tag.map(|b| b.to_ascii_lowercase());
    match tag {
        TYPE_SP78 => {
            let raw: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
            Some(f64::from(i16::from_be_bytes(raw)) / 256.0)
        },
        TYPE_FPE2 => {
            let raw: [u8; 2] = bytes.get(..2)?.try_into().ok()?;
            Some(f64::from(u16::from_be_bytes(raw)) / 4.0)
        },
        TYPE_FLT => {
            let raw = bytes.get(..4)?;
            let bits = raw.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b));
            Some(f64::from(f32::from_bits(bits)))
        },
        _ => None,
    }
}
