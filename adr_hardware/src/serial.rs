//! Card rack bus over a serial port.

use std::io::Write;
use std::time::Duration;

use adr_traits::BusWriter;
use serialport::SerialPort;

use crate::error::{HwError, Result};

/// Write timeout for one frame; a frame is five bytes, so this only trips
/// when the adapter has gone away.
const WRITE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct SerialBus {
    port: Box<dyn SerialPort>,
}

impl SerialBus {
    pub fn open(path: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(path, baud)
            .timeout(WRITE_TIMEOUT)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()?;
        tracing::info!(path, baud, "serial bus opened");
        Ok(Self { port })
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes).map_err(map_io)?;
        self.port.flush().map_err(map_io)?;
        Ok(())
    }
}

fn map_io(e: std::io::Error) -> HwError {
    if e.kind() == std::io::ErrorKind::TimedOut {
        HwError::Timeout
    } else {
        HwError::Io(e)
    }
}

impl BusWriter for SerialBus {
    fn write(&mut self, bytes: &[u8]) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.write_frame(bytes).map_err(|e| {
            tracing::error!(error = %e, "serial bus write failed");
            Box::new(e) as Box<dyn std::error::Error + Send + Sync>
        })
    }
}
