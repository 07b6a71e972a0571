//! Resistance bridge range classification.
//!
//! The bridge exposes 23 half-decade ranges. A reading is classified to the
//! first range whose upper bound is at or above it; anything beyond the last
//! bound clamps to range 23.

use core::fmt;
use core::str::FromStr;

use crate::error::AdrError;

pub use adr_traits::RANGE_BOUNDS_OHM;

/// Default inflation applied to the reading for the upper edge of the band.
pub const HYSTERESIS_FACTOR: f64 = 1.1;

/// Bridge range code in `1..=23`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeCode(u8);

impl RangeCode {
    pub const MIN: Self = Self(1);
    pub const MAX: Self = Self(23);

    pub fn new(code: u8) -> Result<Self, AdrError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&code) {
            Ok(Self(code))
        } else {
            Err(AdrError::InvalidValue(format!(
                "range code {code} outside 1..=23"
            )))
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Largest resistance this range can read.
    pub fn upper_bound_ohm(self) -> f64 {
        RANGE_BOUNDS_OHM[usize::from(self.0 - 1)]
    }
}

impl fmt::Display for RangeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses the range string reported by the instrument, e.g. `" 12\r\n"`.
impl FromStr for RangeCode {
    type Err = AdrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let code: u8 = t
            .parse()
            .map_err(|_| AdrError::InvalidValue(format!("unparseable range code {t:?}")))?;
        Self::new(code)
    }
}

/// Classify a resistance (ohms) to its range code.
///
/// Values above the last bound clamp to [`RangeCode::MAX`]. Negative or
/// non-finite values are rejected.
pub fn classify(value: f64) -> Result<RangeCode, AdrError> {
    if !value.is_finite() {
        return Err(AdrError::InvalidValue(format!(
            "resistance must be finite, got {value}"
        )));
    }
    if value < 0.0 {
        return Err(AdrError::InvalidValue(format!(
            "resistance must be >= 0, got {value}"
        )));
    }
    let idx = RANGE_BOUNDS_OHM.partition_point(|&b| b < value);
    let code = (idx + 1).min(RANGE_BOUNDS_OHM.len());
    // idx + 1 is clamped to 1..=23 above.
    Ok(RangeCode(code as u8))
}

/// Classify `value` and `value * inflate_factor`, returning `(low, high)`.
///
/// The two codes differ only when the reading sits within the band just below
/// a boundary.
pub fn classify_with_hysteresis(
    value: f64,
    inflate_factor: f64,
) -> Result<(RangeCode, RangeCode), AdrError> {
    if !(inflate_factor.is_finite() && inflate_factor >= 1.0) {
        return Err(AdrError::InvalidValue(format!(
            "hysteresis factor must be finite and >= 1, got {inflate_factor}"
        )));
    }
    let low = classify(value)?;
    let inflated = value * inflate_factor;
    let high = if inflated.is_infinite() {
        RangeCode::MAX
    } else {
        classify(inflated)?
    };
    Ok((low, high))
}

/// Decide whether a range change is due.
///
/// Only when both the plain and the inflated classification disagree with
/// the live range is `high` returned; a single disagreement means the reading
/// is inside the hysteresis band and the range is held.
pub fn hysteresis_target(now: RangeCode, low: RangeCode, high: RangeCode) -> Option<RangeCode> {
    (low != now && high != now).then_some(high)
}
