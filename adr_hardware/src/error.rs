use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("bridge timeout")]
    Timeout,
    #[error("no thermometer on channel {0}")]
    NoSuchChannel(u8),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "hardware")]
impl From<serialport::Error> for HwError {
    fn from(e: serialport::Error) -> Self {
        match e.kind() {
            serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut) => Self::Timeout,
            _ => Self::Serial(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, HwError>;
