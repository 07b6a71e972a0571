use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AdrError {
    /// Classifier or servo input outside its domain (negative, NaN, ...).
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// A field or word does not fit the bit width reserved for it.
    #[error("{field} = {value} does not fit in {bits} bits")]
    Range {
        field: &'static str,
        value: u64,
        bits: u32,
    },
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("timeout waiting for hardware")]
    Timeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing temperature controller")]
    MissingController,
    #[error("missing magnet relay")]
    MissingRelay,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
