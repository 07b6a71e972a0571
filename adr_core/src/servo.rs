//! Temperature servo orchestration.
//!
//! The heater output is shared between the magnet ramp and the closed-loop
//! temperature servo; a relay selects which one it drives. Switching is only
//! safe with the heater at zero, so both setup paths check that first and
//! report a rejected precondition instead of touching the hardware.
//!
//! Every hardware change is followed by a settle wait on the injected clock.

use std::sync::Arc;

use adr_traits::{Clock, ControlMode, MagnetRelay, Polarity, TemperatureController};
use tracing::{debug, info, warn};

use crate::builder::TempServoBuilder;
use crate::config::{ServoCfg, SettleCfg, StabilityCfg};
use crate::error::{AdrError, Result};
use crate::hw_error::HwResultExt;
use crate::range::{RangeCode, classify_with_hysteresis, hysteresis_target};
use crate::status::{AutorangeDecision, Precondition, ServoState, ServoStatus};

/// Servo for one control channel. Owns its controller and relay.
pub struct TempServo<T: TemperatureController, R: MagnetRelay> {
    pub(crate) controller: T,
    pub(crate) relay: R,
    pub(crate) cfg: ServoCfg,
    pub(crate) settle: SettleCfg,
    pub(crate) stability: StabilityCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) state: ServoState,
}

impl<T: TemperatureController, R: MagnetRelay> core::fmt::Debug for TempServo<T, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TempServo")
            .field("channel", &self.cfg.channel)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// The instrument reports exactly 0 once the heater has been zeroed.
#[allow(clippy::float_cmp)]
fn is_zero(v: f64) -> bool {
    v == 0.0
}

fn check_target(target_k: f64) -> std::result::Result<(), AdrError> {
    if !target_k.is_finite() || target_k < 0.0 {
        return Err(AdrError::InvalidValue(format!(
            "temperature target must be finite and >= 0, got {target_k}"
        )));
    }
    Ok(())
}

impl<T: TemperatureController, R: MagnetRelay> TempServo<T, R> {
    pub fn builder() -> TempServoBuilder<T, R> {
        TempServoBuilder::default()
    }

    pub const fn state(&self) -> ServoState {
        self.state
    }

    pub const fn channel(&self) -> u8 {
        self.cfg.channel
    }

    pub const fn servo_cfg(&self) -> &ServoCfg {
        &self.cfg
    }

    pub const fn controller(&self) -> &T {
        &self.controller
    }

    pub const fn controller_mut(&mut self) -> &mut T {
        &mut self.controller
    }

    pub const fn relay(&self) -> &R {
        &self.relay
    }

    /// Switch the heater over to the magnet ramp.
    pub fn setup_ramp(&mut self) -> Result<ServoStatus> {
        let heater_out = self.heater_output()?;
        if !is_zero(heater_out) {
            let why = Precondition::HeaterNotZero { heater_out };
            warn!(%why, "ramp setup rejected");
            return Ok(ServoStatus::PreconditionFailed(why));
        }

        self.set_heater_output(0.0)?;
        self.controller
            .magnet_ramp_setup()
            .hw("configure magnet ramp")?;
        self.set_heater_output(0.0)?;
        self.relay.set_to_ramp().hw("switch relay to ramp")?;
        self.state = ServoState::ReadyToRamp;
        info!(state = %self.state, "ramp setup done");
        self.clock.sleep(self.settle.ramp);
        Ok(ServoStatus::Applied)
    }

    /// Switch the heater over to closed-loop control of the configured channel
    /// and engage it at the initial setpoint.
    pub fn setup_temp_control(&mut self) -> Result<ServoStatus> {
        let ch = self.cfg.channel;
        let heater_out = self.heater_output()?;
        if !is_zero(heater_out) {
            if self.state.ready_to_control() {
                info!("already controlling; control setup skipped");
                return Ok(ServoStatus::AlreadyControlling);
            }
            let why = Precondition::HeaterNotZero { heater_out };
            warn!(%why, "control setup rejected");
            return Ok(ServoStatus::PreconditionFailed(why));
        }

        info!(
            channel = ch,
            excitation_a = self.cfg.excitation_a,
            "setting up temperature control"
        );
        self.controller
            .set_control_polarity(Polarity::Unipolar)
            .hw("set control polarity")?;
        self.relay.set_to_control().hw("switch relay to control")?;
        self.controller
            .set_scan(ch, false)
            .hw("scan control channel")?;
        self.clock.sleep(self.settle.scan);
        self.apply_read_channel(self.cfg.base_resistance_ohm)?;
        self.clock.sleep(self.settle.read_channel);

        // With the heater range at zero the setpoint takes effect immediately.
        self.controller
            .set_heater_range(0)
            .hw("zero heater range")?;
        self.controller
            .set_control_mode(ControlMode::Closed)
            .hw("set closed-loop control")?;
        self.controller
            .set_temperature_setpoint(self.cfg.initial_setpoint_k)
            .hw("write initial setpoint")?;
        self.controller
            .set_ramp(true, self.cfg.ramp_rate_k_per_min)
            .hw("enable setpoint ramp")?;
        self.controller
            .set_heater_range(self.cfg.heater_range)
            .hw("restore heater range")?;

        self.state = ServoState::ReadyToControl;
        info!(state = %self.state, setpoint_k = self.cfg.initial_setpoint_k, "control engaged");
        self.clock.sleep(self.settle.control);
        Ok(ServoStatus::Applied)
    }

    /// Move the setpoint to `target_k`. Requires control to be set up.
    ///
    /// The state check comes first, so an unusable target before setup still
    /// reports the precondition rather than an error.
    pub fn go_to_temp(&mut self, target_k: f64) -> Result<ServoStatus> {
        if !self.state.ready_to_control() {
            let why = Precondition::NotReadyToControl { state: self.state };
            warn!(%why, target_k, "go to temp rejected");
            return Ok(ServoStatus::PreconditionFailed(why));
        }
        check_target(target_k)?;

        self.apply_read_channel(self.cfg.base_resistance_ohm)?;
        self.clock.sleep(self.settle.setpoint);
        self.controller
            .set_temperature_setpoint(target_k)
            .hw("write setpoint")?;
        info!(target_k, "setpoint changed");
        Ok(ServoStatus::Applied)
    }

    /// Re-range the control channel when the reading has left the live range
    /// by more than the hysteresis band.
    pub fn safe_autorange(&mut self) -> Result<AutorangeDecision> {
        let ch = self.cfg.channel;
        let resistance = self
            .controller
            .resistance(ch)
            .hw("read control resistance")?;
        let (low, high) = classify_with_hysteresis(resistance, self.cfg.hysteresis_factor)?;
        let reported = self
            .controller
            .current_range(ch)
            .hw("read current range")?;
        let now = reported.parse::<RangeCode>().map_err(|e| {
            AdrError::Hardware(format!("instrument reported an unusable range: {e}"))
        })?;

        match hysteresis_target(now, low, high) {
            None => {
                debug!(resistance, now = %now, low = %low, high = %high, "autorange hold");
                Ok(AutorangeDecision::Hold { now })
            }
            Some(to) => {
                let range_ohm = resistance * self.cfg.hysteresis_factor;
                self.apply_read_channel(range_ohm)?;
                info!(resistance, from = %now, to = %to, "autorange changed");
                Ok(AutorangeDecision::Changed { from: now, to })
            }
        }
    }

    /// Read the temperature of another channel, then return the scanner to
    /// the control channel.
    pub fn read_alt_channel(&mut self, alt: u8) -> Result<f64> {
        self.controller
            .set_scan(alt, false)
            .hw("scan alternate channel")?;
        self.clock.sleep(self.settle.scan);
        let t = self
            .controller
            .temperature(alt)
            .hw("read alternate channel")?;
        self.controller
            .set_scan(self.cfg.channel, false)
            .hw("scan control channel")?;
        debug!(alt, temperature_k = t, "alternate channel read");
        Ok(t)
    }

    pub fn temperature(&mut self) -> Result<f64> {
        self.controller
            .temperature(self.cfg.channel)
            .hw("read temperature")
    }

    pub fn setpoint(&mut self) -> Result<f64> {
        self.controller
            .temperature_setpoint()
            .hw("read setpoint")
    }

    /// Write the setpoint directly, bypassing the read-channel setup of
    /// [`Self::go_to_temp`].
    pub fn set_setpoint(&mut self, kelvin: f64) -> Result<()> {
        check_target(kelvin)?;
        self.controller
            .set_temperature_setpoint(kelvin)
            .hw("write setpoint")
    }

    /// Temperature minus setpoint (K).
    pub fn temperature_error(&mut self) -> Result<f64> {
        let t = self.temperature()?;
        let sp = self.setpoint()?;
        Ok(t - sp)
    }

    pub fn heater_output(&mut self) -> Result<f64> {
        self.controller.heater_output().hw("read heater output")
    }

    pub fn set_heater_output(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(AdrError::InvalidValue(format!(
                "heater output must be finite, got {value}"
            ))
            .into());
        }
        self.controller
            .set_manual_heater_output(value)
            .hw("write heater output")
    }

    fn apply_read_channel(&mut self, resistance_range: f64) -> Result<()> {
        self.controller
            .set_read_channel(self.cfg.channel, self.cfg.excitation_a, resistance_range)
            .hw("configure read channel")
    }
}
