//! Runtime configuration used by `TempServo`.
//!
//! Separate from the TOML schema in `adr_config`; see `conversions` for the
//! mapping.

use std::time::Duration;

use crate::range::HYSTERESIS_FACTOR;

/// Control channel and the bridge/heater values applied during setup.
#[derive(Debug, Clone)]
pub struct ServoCfg {
    /// Bridge channel carrying the control thermometer (1-based).
    pub channel: u8,
    /// Excitation range (A) written with every read-channel setup.
    pub excitation_a: f64,
    /// Resistance range (ohms) used when control is engaged at base.
    pub base_resistance_ohm: f64,
    /// Setpoint ramp rate in K/min.
    pub ramp_rate_k_per_min: f64,
    pub initial_setpoint_k: f64,
    pub heater_range: u32,
    /// Inflation factor for autorange. Must be >= 1.
    pub hysteresis_factor: f64,
}

impl Default for ServoCfg {
    fn default() -> Self {
        Self {
            channel: 1,
            excitation_a: 10e-9,
            base_resistance_ohm: 60e3,
            ramp_rate_k_per_min: 0.05,
            initial_setpoint_k: 0.035,
            heater_range: 100,
            hysteresis_factor: HYSTERESIS_FACTOR,
        }
    }
}

/// Waits after hardware changes. The instrument needs these to settle before
/// the next command is meaningful.
#[derive(Debug, Clone)]
pub struct SettleCfg {
    pub ramp: Duration,
    pub scan: Duration,
    pub read_channel: Duration,
    pub control: Duration,
    pub setpoint: Duration,
}

impl Default for SettleCfg {
    fn default() -> Self {
        Self {
            ramp: Duration::from_secs(5),
            scan: Duration::from_secs(5),
            read_channel: Duration::from_secs(5),
            control: Duration::from_secs(2),
            setpoint: Duration::from_secs(3),
        }
    }
}

impl SettleCfg {
    /// All waits zero; useful against simulated hardware.
    pub const fn immediate() -> Self {
        Self {
            ramp: Duration::ZERO,
            scan: Duration::ZERO,
            read_channel: Duration::ZERO,
            control: Duration::ZERO,
            setpoint: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StabilityCfg {
    pub poll_interval: Duration,
    /// Readings the bridge averages for the RMS statistic.
    pub rms_points: usize,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            rms_points: 10,
        }
    }
}
