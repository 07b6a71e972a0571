#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas and heater-log parsing for the ADR control stack.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//!   Every section is optional; missing sections take the bench defaults.
//! - Heater-log CSV loader reads the housekeeping logs written during
//!   magnet cycles (time, temperature, heater output).
use serde::Deserialize;

/// One row of a housekeeping heater log.
///
/// Column 0 is a free-form label; columns 1..=3 carry the data:
/// label,time_s,temperature_k,heater_out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterLogRow {
    pub time_s: f64,
    pub temperature_k: f64,
    pub heater_out: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServoCfg {
    /// Bridge channel carrying the control thermometer
    pub channel: u8,
    /// Thermometer excitation range (amps)
    pub excitation_a: f64,
    /// Resistance range used at base temperature (ohms)
    pub base_resistance_ohm: f64,
    /// Setpoint ramp rate (K/min)
    pub ramp_rate_k_per_min: f64,
    /// Setpoint written when closed-loop control is first engaged
    pub initial_setpoint_k: f64,
    /// Heater range restored after the setpoint has been applied
    pub heater_range: u32,
    /// Inflation factor for the autorange hysteresis band
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
            hysteresis_factor: 1.1,
        }
    }
}

/// Settle waits after hardware reconfiguration (ms).
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SettleCfg {
    pub ramp_ms: u64,
    pub scan_ms: u64,
    pub read_channel_ms: u64,
    pub control_ms: u64,
    pub setpoint_ms: u64,
}

impl Default for SettleCfg {
    fn default() -> Self {
        Self {
            ramp_ms: 5000,
            scan_ms: 5000,
            read_channel_ms: 5000,
            control_ms: 2000,
            setpoint_ms: 3000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StabilityCfg {
    /// Default |T - setpoint| tolerance (K); the RMS limit is tolerance * 1e6 uK
    pub tolerance_k: f64,
    pub timeout_s: u64,
    pub poll_s: u64,
    /// Number of readings the bridge averages for the RMS statistic
    pub rms_points: usize,
}

impl Default for StabilityCfg {
    fn default() -> Self {
        Self {
            tolerance_k: 0.0005,
            timeout_s: 180,
            poll_s: 10,
            rms_points: 10,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusCfg {
    /// Serial device for the card rack; absent means the simulated bus
    pub port: Option<String>,
    pub baud: u32,
    /// Minimum gap after each frame (ms); never below 1
    pub frame_gap_ms: u64,
}

impl Default for BusCfg {
    fn default() -> Self {
        Self {
            port: None,
            baud: 115_200,
            frame_gap_ms: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CardCfg {
    pub address: u8,
    pub slot: u8,
    pub seqln: u8,
    pub delay: u8,
}

impl Default for CardCfg {
    fn default() -> Self {
        Self {
            address: 32,
            slot: 9,
            seqln: 4,
            delay: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HealthCfg {
    /// Heater output above which the magnet is considered ramping up
    pub magup_max: f64,
}

impl Default for HealthCfg {
    fn default() -> Self {
        Self { magup_max: 85.0 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub servo: ServoCfg,
    pub settle: SettleCfg,
    pub stability: StabilityCfg,
    pub bus: BusCfg,
    pub card: CardCfg,
    pub health: HealthCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

fn positive_finite(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Servo
        if self.servo.channel == 0 {
            eyre::bail!("servo.channel must be >= 1");
        }
        if !positive_finite(self.servo.excitation_a) {
            eyre::bail!("servo.excitation_a must be > 0");
        }
        if !positive_finite(self.servo.base_resistance_ohm) {
            eyre::bail!("servo.base_resistance_ohm must be > 0");
        }
        if !positive_finite(self.servo.ramp_rate_k_per_min) {
            eyre::bail!("servo.ramp_rate_k_per_min must be > 0");
        }
        if !(self.servo.initial_setpoint_k.is_finite() && self.servo.initial_setpoint_k >= 0.0) {
            eyre::bail!("servo.initial_setpoint_k must be >= 0");
        }
        if !(self.servo.hysteresis_factor.is_finite() && self.servo.hysteresis_factor >= 1.0) {
            eyre::bail!("servo.hysteresis_factor must be >= 1.0");
        }

        // Settle
        if self.settle.ramp_ms > 10 * 60 * 1000 {
            eyre::bail!("settle.ramp_ms is unreasonably large (>10min)");
        }

        // Stability
        if !positive_finite(self.stability.tolerance_k) {
            eyre::bail!("stability.tolerance_k must be > 0");
        }
        if self.stability.poll_s == 0 {
            eyre::bail!("stability.poll_s must be >= 1");
        }
        if self.stability.timeout_s <= self.stability.poll_s {
            eyre::bail!("stability.timeout_s must be greater than stability.poll_s");
        }
        if self.stability.rms_points == 0 {
            eyre::bail!("stability.rms_points must be >= 1");
        }

        // Bus
        if self.bus.frame_gap_ms == 0 {
            eyre::bail!("bus.frame_gap_ms must be >= 1");
        }
        if self.bus.baud == 0 {
            eyre::bail!("bus.baud must be > 0");
        }

        // Card
        if self.card.address > 0x7f {
            eyre::bail!("card.address must fit in 7 bits (0..=127)");
        }
        if self.card.delay > 0x0f {
            eyre::bail!("card.delay must fit in 4 bits (0..=15)");
        }

        // Health
        if !self.health.magup_max.is_finite() {
            eyre::bail!("health.magup_max must be finite");
        }

        Ok(())
    }
}

/// Load a heater log. Rows must have at least four columns; a header row is
/// required and skipped.
pub fn load_heater_log_csv(path: &std::path::Path) -> eyre::Result<Vec<HeaterLogRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open heater log {:?}: {}", path, e))?;

    let mut rows = Vec::new();
    for (idx, rec) in rdr.records().enumerate() {
        // +2: one for the header, one for 1-based numbering
        let line = idx + 2;
        let rec = rec.map_err(|e| eyre::eyre!("invalid heater log row {}: {}", line, e))?;
        if rec.len() < 4 {
            eyre::bail!(
                "invalid heater log row {}: expected 4 columns, got {}",
                line,
                rec.len()
            );
        }
        let field = |i: usize| -> eyre::Result<f64> {
            rec[i]
                .parse::<f64>()
                .map_err(|e| eyre::eyre!("invalid heater log row {} column {}: {}", line, i, e))
        };
        rows.push(HeaterLogRow {
            time_s: field(1)?,
            temperature_k: field(2)?,
            heater_out: field(3)?,
        });
    }
    Ok(rows)
}
