#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core ADR control logic (hardware-agnostic).
//!
//! All hardware interactions go through the `adr_traits` seams
//! (`BusWriter`, `TemperatureController`, `MagnetRelay`) and every wait goes
//! through `adr_traits::Clock`, so the whole crate runs against simulated
//! devices and a manual clock in tests.
//!
//! ## Architecture
//!
//! - **Codec**: 28-bit control word <-> 5-byte addressed serial frame (`codec`)
//! - **Registers**: BAD16 WREG0/WREG1 field layouts (`registers`)
//! - **Bus / Card**: settled frame writes and the BAD16 card handle (`bus`, `card`)
//! - **Range**: bridge range classification with hysteresis (`range`)
//! - **Servo**: ramp/control state machine, autorange, stability polling
//!   (`servo`, `stability`, `builder`)
//! - **Health**: demag-cycle detection in heater logs (`health`)
//! - **Status**: non-fatal outcomes reported to frontends (`status`)

pub mod builder;
pub mod bus;
pub mod card;
pub mod codec;
pub mod config;
pub mod conversions;
pub mod error;
pub mod health;
pub mod hw_error;
pub mod range;
pub mod registers;
pub mod servo;
pub mod stability;
pub mod status;

pub use builder::TempServoBuilder;
pub use bus::SettledBus;
pub use card::Bad16Card;
pub use codec::{CardAddress, ControlWord, SerialFrame, decode, encode};
pub use config::{ServoCfg, SettleCfg, StabilityCfg};
pub use error::{AdrError, BuildError, Result};
pub use range::{RangeCode, classify, classify_with_hysteresis};
pub use registers::{Wreg0, Wreg1};
pub use servo::TempServo;
pub use status::{AutorangeDecision, Precondition, ServoState, ServoStatus, Settle, Stability};
