//! Builder for `TempServo`.
//!
//! Controller and relay are required; configuration and clock fall back to
//! the bench defaults and `MonotonicClock`. All values are validated on
//! `build()`.

use std::sync::Arc;

use adr_traits::{Clock, MagnetRelay, MonotonicClock, TemperatureController};

use crate::config::{ServoCfg, SettleCfg, StabilityCfg};
use crate::error::{BuildError, Result};
use crate::servo::TempServo;
use crate::status::ServoState;

pub struct TempServoBuilder<T, R> {
    controller: Option<T>,
    relay: Option<R>,
    servo: Option<ServoCfg>,
    settle: Option<SettleCfg>,
    stability: Option<StabilityCfg>,
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl<T, R> Default for TempServoBuilder<T, R> {
    fn default() -> Self {
        Self {
            controller: None,
            relay: None,
            servo: None,
            settle: None,
            stability: None,
            clock: None,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(servo: &ServoCfg, stability: &StabilityCfg) -> Result<()> {
    if servo.channel == 0 {
        return Err(invalid("channel must be >= 1"));
    }
    if !(servo.excitation_a.is_finite() && servo.excitation_a > 0.0) {
        return Err(invalid("excitation_a must be > 0"));
    }
    if !(servo.base_resistance_ohm.is_finite() && servo.base_resistance_ohm > 0.0) {
        return Err(invalid("base_resistance_ohm must be > 0"));
    }
    if !(servo.ramp_rate_k_per_min.is_finite() && servo.ramp_rate_k_per_min > 0.0) {
        return Err(invalid("ramp_rate_k_per_min must be > 0"));
    }
    if !(servo.initial_setpoint_k.is_finite() && servo.initial_setpoint_k >= 0.0) {
        return Err(invalid("initial_setpoint_k must be >= 0"));
    }
    if !(servo.hysteresis_factor.is_finite() && servo.hysteresis_factor >= 1.0) {
        return Err(invalid("hysteresis_factor must be >= 1"));
    }
    if stability.poll_interval.is_zero() {
        return Err(invalid("poll_interval must be > 0"));
    }
    if stability.rms_points == 0 {
        return Err(invalid("rms_points must be >= 1"));
    }
    Ok(())
}

impl<T: TemperatureController, R: MagnetRelay> TempServoBuilder<T, R> {
    pub fn with_controller(mut self, controller: T) -> Self {
        self.controller = Some(controller);
        self
    }
    pub fn with_relay(mut self, relay: R) -> Self {
        self.relay = Some(relay);
        self
    }
    pub fn with_servo_cfg(mut self, servo: ServoCfg) -> Self {
        self.servo = Some(servo);
        self
    }
    pub fn with_settle(mut self, settle: SettleCfg) -> Self {
        self.settle = Some(settle);
        self
    }
    pub fn with_stability(mut self, stability: StabilityCfg) -> Self {
        self.stability = Some(stability);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<TempServo<T, R>> {
        let controller = self
            .controller
            .ok_or_else(|| eyre::Report::new(BuildError::MissingController))?;
        let relay = self
            .relay
            .ok_or_else(|| eyre::Report::new(BuildError::MissingRelay))?;
        let cfg = self.servo.unwrap_or_default();
        let stability = self.stability.unwrap_or_default();
        validate(&cfg, &stability)?;

        let clock: Arc<dyn Clock + Send + Sync> = match self.clock {
            Some(b) => Arc::from(b),
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(TempServo {
            controller,
            relay,
            cfg,
            settle: self.settle.unwrap_or_default(),
            stability,
            clock,
            state: ServoState::Idle,
        })
    }
}
