pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Upper bound (ohms, inclusive) of each bridge range code, index 0 = code 1.
/// These are the values the instrument firmware uses, rounded to three
/// significant figures, not exact half decades.
pub const RANGE_BOUNDS_OHM: [f64; 23] = [
    2e-3, 6.32e-3, 20e-3, 63.2e-3, 200e-3, 632e-3, 2.0, 6.32, 20.0, 63.2, 200.0, 632.0, 2e3,
    6.32e3, 20e3, 63.2e3, 200e3, 632e3, 2e6, 6.32e6, 20e6, 63.2e6, 200e6,
];

/// Closed-loop vs. manual heater control on the temperature bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Off,
    Open,
    Closed,
}

/// Heater output polarity used while servoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Unipolar,
    Bipolar,
}

/// Write side of the shared card bus. Frames are assumed delivered in order;
/// callers enforce the inter-frame delay themselves.
pub trait BusWriter {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Resistance bridge / temperature controller consumed by the servo.
pub trait TemperatureController {
    fn temperature(&mut self, channel: u8)
    -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
    fn resistance(&mut self, channel: u8) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
    /// RMS temperature noise in microkelvin over the last `npts` readings.
    fn temperature_rms_uk(
        &mut self,
        channel: u8,
        npts: usize,
    ) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
    fn heater_output(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
    fn set_manual_heater_output(
        &mut self,
        value: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_read_channel(
        &mut self,
        channel: u8,
        excitation_range: f64,
        resistance_range: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_temperature_setpoint(
        &mut self,
        kelvin: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn temperature_setpoint(&mut self) -> Result<f64, Box<dyn std::error::Error + Send + Sync>>;
    /// Range code currently active on `channel`, as reported by the instrument.
    fn current_range(
        &mut self,
        channel: u8,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
    fn set_control_mode(
        &mut self,
        mode: ControlMode,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_control_polarity(
        &mut self,
        polarity: Polarity,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_ramp(
        &mut self,
        enabled: bool,
        rate_k_per_min: f64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_heater_range(&mut self, range: u32)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_scan(
        &mut self,
        channel: u8,
        autoscan: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    /// Put the heater loop into magnet-ramp configuration.
    fn magnet_ramp_setup(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Relay selecting whether the heater output drives the magnet ramp or the
/// temperature servo.
pub trait MagnetRelay {
    fn set_to_ramp(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_to_control(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: BusWriter + ?Sized> BusWriter for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write(bytes)
    }
}
