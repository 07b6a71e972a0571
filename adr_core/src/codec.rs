//! Register codec for the card rack serial bus.
//!
//! A control word is split into four 7-bit groups, each shifted up one bit
//! so that bit 0 of every payload byte stays clear. The fifth byte carries
//! the 7-bit card address shifted up one bit with bit 0 set, which marks the
//! end of the frame on the shared bus.
//!
//! ```text
//! byte 0: w[6:0]   << 1
//! byte 1: w[13:7]  << 1
//! byte 2: w[20:14] << 1
//! byte 3: w[27:21] << 1
//! byte 4: addr     << 1 | 1
//! ```

use core::fmt;

use crate::error::AdrError;

pub const FRAME_LEN: usize = 5;
/// Payload bits carried by one frame (four 7-bit groups).
pub const WORD_BITS: u32 = 28;
pub const MAX_WORD: u32 = (1 << WORD_BITS) - 1;
pub const ADDRESS_BITS: u32 = 7;
pub const MAX_ADDRESS: u8 = 0x7f;

const GROUP_BITS: u32 = 7;
const GROUP_MASK: u32 = 0x7f;
const ADDRESS_MARKER: u8 = 0x01;

/// A control word that fits the 28 payload bits of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ControlWord(u32);

impl ControlWord {
    pub fn new(value: u32) -> Result<Self, AdrError> {
        if value > MAX_WORD {
            return Err(AdrError::Range {
                field: "control word",
                value: u64::from(value),
                bits: WORD_BITS,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for ControlWord {
    type Error = AdrError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// 7-bit card address on the rack bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CardAddress(u8);

impl CardAddress {
    pub fn new(value: u8) -> Result<Self, AdrError> {
        if value > MAX_ADDRESS {
            return Err(AdrError::Range {
                field: "card address",
                value: u64::from(value),
                bits: ADDRESS_BITS,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CardAddress {
    type Error = AdrError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for CardAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exactly five bytes as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SerialFrame([u8; FRAME_LEN]);

impl SerialFrame {
    /// Build the frame for an already validated word and address.
    pub fn from_parts(word: ControlWord, address: CardAddress) -> Self {
        let w = word.get();
        let mut bytes = [0u8; FRAME_LEN];
        for (i, b) in bytes.iter_mut().take(4).enumerate() {
            // Masked to 7 bits, so the shifted value always fits a byte.
            let group = (w >> (GROUP_BITS * i as u32)) & GROUP_MASK;
            *b = (group as u8) << 1;
        }
        bytes[4] = (address.get() << 1) | ADDRESS_MARKER;
        Self(bytes)
    }

    /// Split the frame back into word and address, checking the framing bits.
    pub fn parts(&self) -> Result<(ControlWord, CardAddress), AdrError> {
        let mut w: u32 = 0;
        for (i, b) in self.0.iter().take(4).enumerate() {
            if b & ADDRESS_MARKER != 0 {
                return Err(AdrError::MalformedFrame(format!(
                    "payload byte {i} (0x{b:02x}) has the address marker set"
                )));
            }
            w |= u32::from(b >> 1) << (GROUP_BITS * i as u32);
        }
        let last = self.0[4];
        if last & ADDRESS_MARKER == 0 {
            return Err(AdrError::MalformedFrame(format!(
                "address byte 0x{last:02x} is missing the address marker"
            )));
        }
        // Four 7-bit groups and a 7-bit address cannot exceed their limits.
        Ok((ControlWord(w), CardAddress(last >> 1)))
    }

    #[inline]
    pub const fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    #[inline]
    pub const fn into_bytes(self) -> [u8; FRAME_LEN] {
        self.0
    }
}

impl From<[u8; FRAME_LEN]> for SerialFrame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for SerialFrame {
    type Error = AdrError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; FRAME_LEN] = bytes.try_into().map_err(|_| {
            AdrError::MalformedFrame(format!(
                "expected {FRAME_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for SerialFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Encode `control_word` for the card at `address`.
///
/// Fails with `AdrError::Range` when the address needs more than 7 bits or
/// the word more than 28.
pub fn encode(control_word: u32, address: u8) -> Result<SerialFrame, AdrError> {
    let word = ControlWord::new(control_word)?;
    let address = CardAddress::new(address)?;
    Ok(SerialFrame::from_parts(word, address))
}

/// Inverse of [`encode`].
pub fn decode(frame: &SerialFrame) -> Result<(u32, u8), AdrError> {
    let (word, address) = frame.parts()?;
    Ok((word.get(), address.get()))
}
