//! `From` implementations bridging `adr_config` types to `adr_core` types.

use std::time::Duration;

use crate::config::{ServoCfg, SettleCfg, StabilityCfg};

// ── ServoCfg ─────────────────────────────────────────────────────────────────

impl From<&adr_config::ServoCfg> for ServoCfg {
    fn from(c: &adr_config::ServoCfg) -> Self {
        Self {
            channel: c.channel,
            excitation_a: c.excitation_a,
            base_resistance_ohm: c.base_resistance_ohm,
            ramp_rate_k_per_min: c.ramp_rate_k_per_min,
            initial_setpoint_k: c.initial_setpoint_k,
            heater_range: c.heater_range,
            hysteresis_factor: c.hysteresis_factor,
        }
    }
}

// ── SettleCfg ────────────────────────────────────────────────────────────────

impl From<&adr_config::SettleCfg> for SettleCfg {
    fn from(c: &adr_config::SettleCfg) -> Self {
        Self {
            ramp: Duration::from_millis(c.ramp_ms),
            scan: Duration::from_millis(c.scan_ms),
            read_channel: Duration::from_millis(c.read_channel_ms),
            control: Duration::from_millis(c.control_ms),
            setpoint: Duration::from_millis(c.setpoint_ms),
        }
    }
}

// ── StabilityCfg ─────────────────────────────────────────────────────────────

impl From<&adr_config::StabilityCfg> for StabilityCfg {
    fn from(c: &adr_config::StabilityCfg) -> Self {
        Self {
            poll_interval: Duration::from_secs(c.poll_s),
            rms_points: c.rms_points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_runtime_defaults() {
        let file = adr_config::Config::default();
        let servo = ServoCfg::from(&file.servo);
        let settle = SettleCfg::from(&file.settle);
        let stab = StabilityCfg::from(&file.stability);

        let d = ServoCfg::default();
        assert_eq!(servo.channel, d.channel);
        assert!((servo.initial_setpoint_k - d.initial_setpoint_k).abs() < 1e-12);
        assert!((servo.hysteresis_factor - d.hysteresis_factor).abs() < 1e-12);
        assert_eq!(settle.ramp, SettleCfg::default().ramp);
        assert_eq!(settle.setpoint, SettleCfg::default().setpoint);
        assert_eq!(stab.poll_interval, StabilityCfg::default().poll_interval);
        assert_eq!(stab.rms_points, 10);
    }
}
