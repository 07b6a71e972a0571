pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;

use std::collections::{BTreeMap, VecDeque};

use adr_traits::{
    BusWriter, ControlMode, MagnetRelay, Polarity, RANGE_BOUNDS_OHM, TemperatureController,
};

use crate::error::HwError;

#[cfg(feature = "hardware")]
pub use serial::SerialBus;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A write the simulated bridge received, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    HeaterOutput(f64),
    MagnetRampSetup,
    ReadChannel {
        channel: u8,
        excitation: f64,
        resistance_range: f64,
    },
    Setpoint(f64),
    ControlMode(ControlMode),
    Polarity(Polarity),
    Ramp { enabled: bool, rate_k_per_min: f64 },
    HeaterRange(u32),
    Scan { channel: u8, autoscan: bool },
}

/// Range the simulated bridge selects for a requested resistance range: the
/// first range whose bound covers it, clamped to 1..=23.
fn bridge_range_code(resistance_range: f64) -> u8 {
    if resistance_range.is_nan() {
        return 1;
    }
    let idx = RANGE_BOUNDS_OHM.partition_point(|&b| b < resistance_range);
    // At most 23, so it fits a u8.
    (idx + 1).min(RANGE_BOUNDS_OHM.len()) as u8
}

/// Simulated resistance bridge with a heater loop.
///
/// With closed-loop control engaged, every temperature read of the control
/// channel moves the temperature a fixed fraction of the way to the setpoint.
pub struct SimulatedBridge {
    control_channel: u8,
    temperature_k: f64,
    alt_temperatures: BTreeMap<u8, f64>,
    resistance_ohm: f64,
    range: String,
    rms_uk: f64,
    approach: f64,
    heater_out: f64,
    heater_script: VecDeque<f64>,
    setpoint_k: f64,
    mode: ControlMode,
    timeout: bool,
    calls: Vec<BridgeCall>,
}

impl Default for SimulatedBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedBridge {
    pub fn new() -> Self {
        Self {
            control_channel: 1,
            temperature_k: 0.1,
            alt_temperatures: BTreeMap::new(),
            resistance_ohm: 60e3,
            range: "16".to_string(),
            rms_uk: 5.0,
            approach: 0.5,
            heater_out: 0.0,
            heater_script: VecDeque::new(),
            setpoint_k: 0.0,
            mode: ControlMode::Off,
            timeout: false,
            calls: Vec::new(),
        }
    }

    pub fn with_control_channel(mut self, channel: u8) -> Self {
        self.control_channel = channel;
        self
    }

    pub const fn set_temperature(&mut self, kelvin: f64) {
        self.temperature_k = kelvin;
    }

    pub fn set_alt_temperature(&mut self, channel: u8, kelvin: f64) {
        self.alt_temperatures.insert(channel, kelvin);
    }

    pub const fn set_resistance(&mut self, ohms: f64) {
        self.resistance_ohm = ohms;
    }

    /// Raw string the bridge reports for its active range.
    pub fn set_range(&mut self, reported: impl Into<String>) {
        self.range = reported.into();
    }

    pub const fn set_rms_uk(&mut self, rms_uk: f64) {
        self.rms_uk = rms_uk;
    }

    /// Fraction of the remaining distance to the setpoint covered per read.
    pub const fn set_approach(&mut self, fraction: f64) {
        self.approach = fraction;
    }

    pub const fn set_heater(&mut self, value: f64) {
        self.heater_out = value;
    }

    /// Values returned by the next heater reads, ahead of the live value.
    pub fn script_heater_reads(&mut self, values: impl IntoIterator<Item = f64>) {
        self.heater_script.extend(values);
    }

    /// Make every read fail with a bridge timeout.
    pub const fn set_timeout(&mut self, on: bool) {
        self.timeout = on;
    }

    pub const fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn calls(&self) -> &[BridgeCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    fn check_timeout(&self) -> Result<(), BoxError> {
        if self.timeout {
            return Err(Box::new(HwError::Timeout));
        }
        Ok(())
    }
}

impl TemperatureController for SimulatedBridge {
    fn temperature(&mut self, channel: u8) -> Result<f64, BoxError> {
        self.check_timeout()?;
        if channel != self.control_channel {
            return self
                .alt_temperatures
                .get(&channel)
                .copied()
                .ok_or_else(|| Box::new(HwError::NoSuchChannel(channel)) as BoxError);
        }
        if self.mode == ControlMode::Closed {
            self.temperature_k += (self.setpoint_k - self.temperature_k) * self.approach;
        }
        tracing::trace!(channel, temperature_k = self.temperature_k, "sim temperature");
        Ok(self.temperature_k)
    }

    fn resistance(&mut self, _channel: u8) -> Result<f64, BoxError> {
        self.check_timeout()?;
        Ok(self.resistance_ohm)
    }

    fn temperature_rms_uk(&mut self, _channel: u8, _npts: usize) -> Result<f64, BoxError> {
        self.check_timeout()?;
        Ok(self.rms_uk)
    }

    fn heater_output(&mut self) -> Result<f64, BoxError> {
        self.check_timeout()?;
        Ok(self.heater_script.pop_front().unwrap_or(self.heater_out))
    }

    fn set_manual_heater_output(&mut self, value: f64) -> Result<(), BoxError> {
        self.heater_out = value;
        self.calls.push(BridgeCall::HeaterOutput(value));
        Ok(())
    }

    fn set_read_channel(
        &mut self,
        channel: u8,
        excitation_range: f64,
        resistance_range: f64,
    ) -> Result<(), BoxError> {
        self.range = bridge_range_code(resistance_range).to_string();
        self.calls.push(BridgeCall::ReadChannel {
            channel,
            excitation: excitation_range,
            resistance_range,
        });
        Ok(())
    }

    fn set_temperature_setpoint(&mut self, kelvin: f64) -> Result<(), BoxError> {
        self.setpoint_k = kelvin;
        self.calls.push(BridgeCall::Setpoint(kelvin));
        Ok(())
    }

    fn temperature_setpoint(&mut self) -> Result<f64, BoxError> {
        self.check_timeout()?;
        Ok(self.setpoint_k)
    }

    fn current_range(&mut self, _channel: u8) -> Result<String, BoxError> {
        self.check_timeout()?;
        Ok(self.range.clone())
    }

    fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), BoxError> {
        self.mode = mode;
        self.calls.push(BridgeCall::ControlMode(mode));
        Ok(())
    }

    fn set_control_polarity(&mut self, polarity: Polarity) -> Result<(), BoxError> {
        self.calls.push(BridgeCall::Polarity(polarity));
        Ok(())
    }

    fn set_ramp(&mut self, enabled: bool, rate_k_per_min: f64) -> Result<(), BoxError> {
        self.calls.push(BridgeCall::Ramp {
            enabled,
            rate_k_per_min,
        });
        Ok(())
    }

    fn set_heater_range(&mut self, range: u32) -> Result<(), BoxError> {
        self.calls.push(BridgeCall::HeaterRange(range));
        Ok(())
    }

    fn set_scan(&mut self, channel: u8, autoscan: bool) -> Result<(), BoxError> {
        self.calls.push(BridgeCall::Scan { channel, autoscan });
        Ok(())
    }

    fn magnet_ramp_setup(&mut self) -> Result<(), BoxError> {
        self.mode = ControlMode::Open;
        self.calls.push(BridgeCall::MagnetRampSetup);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayPosition {
    #[default]
    Unknown,
    Ramp,
    Control,
}

/// Simulated heater relay
#[derive(Debug, Default)]
pub struct SimulatedRelay {
    position: RelayPosition,
    switches: u32,
}

impl SimulatedRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn position(&self) -> RelayPosition {
        self.position
    }

    pub const fn switches(&self) -> u32 {
        self.switches
    }
}

impl MagnetRelay for SimulatedRelay {
    fn set_to_ramp(&mut self) -> Result<(), BoxError> {
        self.position = RelayPosition::Ramp;
        self.switches += 1;
        tracing::debug!("relay -> ramp (simulated)");
        Ok(())
    }

    fn set_to_control(&mut self) -> Result<(), BoxError> {
        self.position = RelayPosition::Control;
        self.switches += 1;
        tracing::debug!("relay -> control (simulated)");
        Ok(())
    }
}

/// Record-only card bus
#[derive(Debug, Default)]
pub struct SimulatedBus {
    frames: Vec<Vec<u8>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Vec<u8>] {
        &self.frames
    }
}

impl BusWriter for SimulatedBus {
    fn write(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        tracing::trace!(len = bytes.len(), "bus frame (simulated)");
        self.frames.push(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heater_script_is_consumed_before_live_value() {
        let mut b = SimulatedBridge::new();
        b.set_heater(2.0);
        b.script_heater_reads([0.0, 1.0]);
        assert_eq!(b.heater_output().unwrap(), 0.0);
        assert_eq!(b.heater_output().unwrap(), 1.0);
        assert_eq!(b.heater_output().unwrap(), 2.0);
    }

    #[test]
    fn range_follows_requested_resistance() {
        assert_eq!(bridge_range_code(0.0), 1);
        assert_eq!(bridge_range_code(2e-3), 1);
        assert_eq!(bridge_range_code(15.0), 9);
        assert_eq!(bridge_range_code(60e3), 16);
        assert_eq!(bridge_range_code(1e12), 23);
    }

    #[test]
    fn range_edges_use_the_instrument_table() {
        assert_eq!(bridge_range_code(63.2e3), 16);
        assert_eq!(bridge_range_code(63.22e3), 17);
        assert_eq!(bridge_range_code(6.321), 9);
    }

    #[test]
    fn relay_tracks_position() {
        let mut r = SimulatedRelay::new();
        r.set_to_ramp().unwrap();
        r.set_to_control().unwrap();
        assert_eq!(r.position(), RelayPosition::Control);
        assert_eq!(r.switches(), 2);
    }
}
