//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "adrctl", version, about = "ADR readout control CLI")]
pub struct Cli {
    /// Path to config TOML (typed); bench defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_u32(s: &str) -> Result<u32, String> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => t.parse::<u32>(),
    };
    parsed.map_err(|e| format!("{t:?} is not a number: {e}"))
}

/// Parse one frame byte written as hex, with or without `0x`.
pub fn parse_hex_byte(s: &str) -> Result<u8, String> {
    let t = s.trim();
    let digits = t
        .strip_prefix("0x")
        .or_else(|| t.strip_prefix("0X"))
        .unwrap_or(t);
    u8::from_str_radix(digits, 16).map_err(|e| format!("{t:?} is not a hex byte: {e}"))
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encode a control word into a 5-byte card frame
    Encode {
        /// Control word (decimal or 0x-hex, at most 28 bits)
        #[arg(long, value_parser = parse_u32)]
        word: u32,
        /// Card address (0..=127); defaults to [card].address
        #[arg(long)]
        address: Option<u8>,
    },
    /// Decode a 5-byte card frame given as hex bytes
    Decode {
        #[arg(value_name = "BYTE", value_parser = parse_hex_byte, num_args = 1..)]
        bytes: Vec<u8>,
    },
    /// Classify a resistance into a bridge range code
    Classify {
        /// Resistance in ohms
        #[arg(allow_negative_numbers = true)]
        ohms: f64,
        /// Also classify the reading inflated by this factor (hysteresis band)
        #[arg(long, value_name = "FACTOR")]
        factor: Option<f64>,
    },
    /// Program a BAD16 card over the configured bus
    Bad16 {
        #[command(subcommand)]
        cmd: Bad16Cmd,
    },
    /// Run a temperature servo session against the simulated bridge
    Servo {
        /// Target temperature (K)
        #[arg(long, default_value_t = 0.05)]
        target: f64,
        /// Stability tolerance (K); defaults to [stability].tolerance_k
        #[arg(long)]
        tolerance: Option<f64>,
        /// Stability timeout (s); defaults to [stability].timeout_s
        #[arg(long = "timeout-s")]
        timeout_s: Option<u64>,
        /// Starting temperature of the simulated stage (K)
        #[arg(long, default_value_t = 0.1)]
        start: f64,
        /// Heater output the simulated bridge reports before setup
        #[arg(long, default_value_t = 0.0)]
        heater: f64,
        /// Control thermometer resistance reported by the simulated bridge (ohms)
        #[arg(long)]
        resistance: Option<f64>,
        /// Range string reported by the simulated bridge
        #[arg(long)]
        range: Option<String>,
        /// RMS noise reported by the simulated bridge (uK)
        #[arg(long = "rms-uk", default_value_t = 5.0)]
        rms_uk: f64,
    },
    /// Find demag-cycle ends in heater logs
    Demags {
        /// Heater log CSV files
        #[arg(value_name = "FILE", num_args = 1..)]
        logs: Vec<PathBuf>,
        /// Heater output threshold; defaults to [health].magup_max
        #[arg(long = "magup-max")]
        magup_max: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum Bad16Cmd {
    /// Send the card-globals register (WREG0)
    Globals {
        #[arg(long, action = ArgAction::SetTrue)]
        led_off: bool,
        #[arg(long, action = ArgAction::SetTrue)]
        status: bool,
        /// Sequence length; defaults to [card].seqln
        #[arg(long)]
        seqln: Option<u8>,
        /// Settling delay (4 bits); defaults to [card].delay
        #[arg(long)]
        delay: Option<u8>,
        /// Set the memory-init flag (sent as a separate write)
        #[arg(long, action = ArgAction::SetTrue)]
        init: bool,
    },
    /// Send the triangle register (WREG1)
    Triangle {
        #[arg(long, default_value_t = 0)]
        dwell: u8,
        #[arg(long, default_value_t = 10)]
        steps: u8,
        #[arg(long, default_value_t = 8)]
        step: u16,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_decimal_words() {
        assert_eq!(parse_u32("0x20A0008"), Ok(34_209_800));
        assert_eq!(parse_u32("34209800"), Ok(34_209_800));
        assert!(parse_u32("0xZZ").is_err());
    }

    #[test]
    fn parses_frame_bytes() {
        assert_eq!(parse_hex_byte("fe"), Ok(0xfe));
        assert_eq!(parse_hex_byte("0x41"), Ok(0x41));
        assert!(parse_hex_byte("100").is_err());
    }
}
