//! Outcomes returned by servo operations.
//!
//! Rejected preconditions are not errors: the servo leaves the hardware
//! untouched and reports why, so a frontend can print the reason and carry on.

use core::fmt;
use std::time::Duration;

use crate::error::AdrError;
use crate::range::RangeCode;

/// Which mode the heater loop has been configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServoState {
    #[default]
    Idle,
    ReadyToRamp,
    ReadyToControl,
}

impl ServoState {
    pub const fn ready_to_ramp(self) -> bool {
        matches!(self, Self::ReadyToRamp)
    }

    pub const fn ready_to_control(self) -> bool {
        matches!(self, Self::ReadyToControl)
    }
}

impl fmt::Display for ServoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::ReadyToRamp => "ready to ramp",
            Self::ReadyToControl => "ready to control",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Precondition {
    HeaterNotZero { heater_out: f64 },
    NotReadyToControl { state: ServoState },
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HeaterNotZero { heater_out } => write!(
                f,
                "heater output is {heater_out}; set it to 0 before switching the relay"
            ),
            Self::NotReadyToControl { state } => write!(
                f,
                "servo is {state}; run temperature-control setup before changing the setpoint"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServoStatus {
    /// The operation ran to completion.
    Applied,
    /// Control setup requested while already in control; nothing to do.
    AlreadyControlling,
    PreconditionFailed(Precondition),
}

impl ServoStatus {
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    pub fn message(&self) -> String {
        match self {
            Self::Applied => "applied".to_string(),
            Self::AlreadyControlling => "already controlling".to_string(),
            Self::PreconditionFailed(p) => p.to_string(),
        }
    }

    /// Turn a rejected precondition into an error for callers that cannot
    /// continue without it. `AlreadyControlling` counts as success.
    pub fn ensure_applied(&self) -> Result<(), AdrError> {
        match self {
            Self::Applied | Self::AlreadyControlling => Ok(()),
            Self::PreconditionFailed(p) => Err(AdrError::PreconditionFailed(p.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutorangeDecision {
    Hold { now: RangeCode },
    Changed { from: RangeCode, to: RangeCode },
}

impl AutorangeDecision {
    pub const fn changed(&self) -> bool {
        matches!(self, Self::Changed { .. })
    }

    /// Range active after the decision was applied.
    pub const fn current(&self) -> RangeCode {
        match *self {
            Self::Hold { now } => now,
            Self::Changed { to, .. } => to,
        }
    }
}

/// Result of a stability wait. `rms_uk` is `None` for the temperature-only
/// check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stability {
    Stable {
        temperature_k: f64,
        rms_uk: Option<f64>,
        polls: u32,
        elapsed: Duration,
    },
    TimedOut {
        temperature_k: f64,
        rms_uk: Option<f64>,
        polls: u32,
        elapsed: Duration,
    },
}

impl Stability {
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Stable { .. })
    }

    pub const fn polls(&self) -> u32 {
        match *self {
            Self::Stable { polls, .. } | Self::TimedOut { polls, .. } => polls,
        }
    }

    /// Last temperature read before returning.
    pub const fn temperature_k(&self) -> f64 {
        match *self {
            Self::Stable { temperature_k, .. } | Self::TimedOut { temperature_k, .. } => {
                temperature_k
            }
        }
    }
}

/// Outcome of `set_temp_and_settle`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Settle {
    Rejected(ServoStatus),
    Waited(Stability),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_controlling_is_not_an_error() {
        assert!(ServoStatus::AlreadyControlling.ensure_applied().is_ok());
        assert!(!ServoStatus::AlreadyControlling.is_applied());
    }

    #[test]
    fn rejected_precondition_mentions_heater() {
        let s = ServoStatus::PreconditionFailed(Precondition::HeaterNotZero { heater_out: 3.0 });
        assert!(s.message().contains("heater output is 3"));
        assert!(matches!(
            s.ensure_applied(),
            Err(AdrError::PreconditionFailed(_))
        ));
    }
}
