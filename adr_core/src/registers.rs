//! BAD16 write-register layouts.
//!
//! Bits 25..=27 of every control word select the register. Fields are
//! checked against their width on packing; bits outside any field are
//! ignored on unpacking.

use crate::codec::ControlWord;
use crate::error::AdrError;

const SELECT_SHIFT: u32 = 25;
const SELECT_MASK: u32 = 0b111;

const WREG0_SELECT: u32 = 0;
const WREG1_SELECT: u32 = 1;

/// Word the legacy acquisition code sent as the triangle default.
pub const LEGACY_WREG1_WORD: u32 = 34_209_800;

fn check_width(field: &'static str, value: u32, bits: u32) -> Result<u32, AdrError> {
    if value >> bits != 0 {
        return Err(AdrError::Range {
            field,
            value: u64::from(value),
            bits,
        });
    }
    Ok(value)
}

fn check_select(word: ControlWord, expected: u32) -> Result<u32, AdrError> {
    let w = word.get();
    let select = (w >> SELECT_SHIFT) & SELECT_MASK;
    if select != expected {
        return Err(AdrError::Range {
            field: "register select",
            value: u64::from(select),
            bits: 3,
        });
    }
    Ok(w)
}

/// Card globals (WREG0).
///
/// | field     | bits   |
/// |-----------|--------|
/// | `status`  | 16     |
/// | `led_off` | 14     |
/// | `delay`   | 10..13 |
/// | `init`    | 8      |
/// | `seqln`   | 0..7   |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wreg0 {
    pub status: bool,
    pub led_off: bool,
    pub delay: u8,
    pub init: bool,
    pub seqln: u8,
}

impl Default for Wreg0 {
    fn default() -> Self {
        Self {
            status: false,
            led_off: false,
            delay: 5,
            init: false,
            seqln: 4,
        }
    }
}

impl Wreg0 {
    pub fn to_word(&self) -> Result<ControlWord, AdrError> {
        let delay = check_width("wreg0.delay", u32::from(self.delay), 4)?;
        let w = (WREG0_SELECT << SELECT_SHIFT)
            | (u32::from(self.status) << 16)
            | (u32::from(self.led_off) << 14)
            | (delay << 10)
            | (u32::from(self.init) << 8)
            | u32::from(self.seqln);
        ControlWord::new(w)
    }

    pub fn from_word(word: ControlWord) -> Result<Self, AdrError> {
        let w = check_select(word, WREG0_SELECT)?;
        Ok(Self {
            status: (w >> 16) & 1 == 1,
            led_off: (w >> 14) & 1 == 1,
            delay: ((w >> 10) & 0x0f) as u8,
            init: (w >> 8) & 1 == 1,
            seqln: (w & 0xff) as u8,
        })
    }
}

/// Triangle waveform parameters (WREG1).
///
/// | field   | bits   |
/// |---------|--------|
/// | `dwell` | 20..23 |
/// | `steps` | 16..19 |
/// | `step`  | 0..13  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wreg1 {
    pub dwell: u8,
    pub steps: u8,
    pub step: u16,
}

impl Default for Wreg1 {
    fn default() -> Self {
        Self {
            dwell: 0,
            steps: 10,
            step: 8,
        }
    }
}

impl Wreg1 {
    pub fn to_word(&self) -> Result<ControlWord, AdrError> {
        let dwell = check_width("wreg1.dwell", u32::from(self.dwell), 4)?;
        let steps = check_width("wreg1.steps", u32::from(self.steps), 4)?;
        let step = check_width("wreg1.step", u32::from(self.step), 14)?;
        let w = (WREG1_SELECT << SELECT_SHIFT) | (dwell << 20) | (steps << 16) | step;
        ControlWord::new(w)
    }

    pub fn from_word(word: ControlWord) -> Result<Self, AdrError> {
        let w = check_select(word, WREG1_SELECT)?;
        Ok(Self {
            dwell: ((w >> 20) & 0x0f) as u8,
            steps: ((w >> 16) & 0x0f) as u8,
            step: (w & 0x3fff) as u16,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wreg1_default_matches_legacy_word() {
        let w = Wreg1::default().to_word().unwrap();
        assert_eq!(w.get(), LEGACY_WREG1_WORD);
        let decoded = Wreg1::from_word(w).unwrap();
        assert_eq!(decoded, Wreg1::default());
    }

    #[test]
    fn wreg0_default_word() {
        // delay 5 << 10 | seqln 4
        assert_eq!(Wreg0::default().to_word().unwrap().get(), (5 << 10) | 4);
    }

    #[test]
    fn wreg0_flags_land_on_their_bits() {
        let r = Wreg0 {
            status: true,
            led_off: true,
            delay: 0,
            init: true,
            seqln: 0,
        };
        assert_eq!(r.to_word().unwrap().get(), (1 << 16) | (1 << 14) | (1 << 8));
    }

    #[test]
    fn wide_fields_are_rejected() {
        let r = Wreg0 {
            delay: 16,
            ..Wreg0::default()
        };
        assert!(matches!(
            r.to_word(),
            Err(AdrError::Range { field: "wreg0.delay", bits: 4, .. })
        ));
        let t = Wreg1 {
            step: 1 << 14,
            ..Wreg1::default()
        };
        assert!(matches!(
            t.to_word(),
            Err(AdrError::Range { field: "wreg1.step", bits: 14, .. })
        ));
    }

    #[test]
    fn select_mismatch_is_rejected() {
        let w1 = Wreg1::default().to_word().unwrap();
        assert!(Wreg0::from_word(w1).is_err());
        let w0 = Wreg0::default().to_word().unwrap();
        assert!(Wreg1::from_word(w0).is_err());
    }
}
