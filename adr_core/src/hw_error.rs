//! Maps `Box<dyn Error>` from trait boundaries to typed `AdrError`.
//!
//! The traits in `adr_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `adr_hardware::HwError` downcasting.

use eyre::WrapErr;

use crate::error::{AdrError, Result};

/// Map a trait-boundary error to a typed `AdrError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> AdrError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<adr_hardware::error::HwError>() {
            return match hw {
                adr_hardware::error::HwError::Timeout => AdrError::Timeout,
                other => AdrError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        AdrError::Timeout
    } else {
        AdrError::Hardware(s)
    }
}

/// Convert a collaborator result into a core result, naming the operation.
pub(crate) trait HwResultExt<T> {
    fn hw(self, what: &'static str) -> Result<T>;
}

impl<T> HwResultExt<T> for std::result::Result<T, Box<dyn std::error::Error + Send + Sync>> {
    fn hw(self, what: &'static str) -> Result<T> {
        self.map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err(what)
    }
}
