//! Polling checks for "has the servo reached its setpoint".
//!
//! Polls read the control channel every `poll_interval`. A poll passes when
//! `|T - setpoint| < tolerance` and, for [`TempServo::wait_stable`], the RMS
//! noise is below `tolerance * 1e6` uK. At most `timeout / poll + 1` polls are
//! made and there is no sleep after the last one.

use std::time::Duration;

use adr_traits::{MagnetRelay, TemperatureController};
use tracing::{debug, info, warn};

use crate::error::{AdrError, Result};
use crate::hw_error::HwResultExt;
use crate::servo::TempServo;
use crate::status::{Settle, Stability};

/// Microkelvin per kelvin, for comparing the RMS statistic with the tolerance.
const UK_PER_K: f64 = 1e6;

fn max_polls(timeout: Duration, poll: Duration) -> u32 {
    let n = timeout.as_nanos() / poll.as_nanos() + 1;
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl<T: TemperatureController, R: MagnetRelay> TempServo<T, R> {
    /// Wait until the temperature is within `tolerance_k` of `setpoint_k` and
    /// its RMS noise is below the same tolerance.
    pub fn wait_stable(
        &mut self,
        setpoint_k: f64,
        tolerance_k: f64,
        timeout: Duration,
    ) -> Result<Stability> {
        self.poll_until_near(setpoint_k, tolerance_k, timeout, true)
    }

    /// Temperature-only variant of [`Self::wait_stable`]; RMS noise is not read.
    pub fn wait_near_setpoint(
        &mut self,
        setpoint_k: f64,
        tolerance_k: f64,
        timeout: Duration,
    ) -> Result<Stability> {
        self.poll_until_near(setpoint_k, tolerance_k, timeout, false)
    }

    /// `go_to_temp` followed by `wait_stable` on the same target.
    pub fn set_temp_and_settle(
        &mut self,
        target_k: f64,
        tolerance_k: f64,
        timeout: Duration,
    ) -> Result<Settle> {
        let status = self.go_to_temp(target_k)?;
        if !status.is_applied() {
            return Ok(Settle::Rejected(status));
        }
        self.wait_stable(target_k, tolerance_k, timeout)
            .map(Settle::Waited)
    }

    fn poll_until_near(
        &mut self,
        setpoint_k: f64,
        tolerance_k: f64,
        timeout: Duration,
        with_rms: bool,
    ) -> Result<Stability> {
        if !(tolerance_k.is_finite() && tolerance_k > 0.0) {
            return Err(AdrError::Config(format!(
                "tolerance must be finite and > 0, got {tolerance_k}"
            ))
            .into());
        }
        let poll = self.stability.poll_interval;
        if timeout <= poll {
            return Err(AdrError::Config(format!(
                "timeout ({timeout:?}) must be greater than the poll interval ({poll:?})"
            ))
            .into());
        }

        let ch = self.cfg.channel;
        let npts = self.stability.rms_points;
        let limit = max_polls(timeout, poll);
        let start = self.clock.now();
        let mut temperature_k = f64::NAN;
        let mut rms_uk = None;

        for polls in 1..=limit {
            temperature_k = self
                .controller
                .temperature(ch)
                .hw("read temperature")?;
            rms_uk = if with_rms {
                Some(
                    self.controller
                        .temperature_rms_uk(ch, npts)
                        .hw("read temperature rms")?,
                )
            } else {
                None
            };
            let near = (temperature_k - setpoint_k).abs() < tolerance_k;
            let quiet = rms_uk.is_none_or(|r| r < tolerance_k * UK_PER_K);
            debug!(poll = polls, temperature_k, ?rms_uk, near, quiet, "stability poll");

            if near && quiet {
                let elapsed = self.clock.now().saturating_duration_since(start);
                info!(setpoint_k, temperature_k, polls, ?elapsed, "temperature stable");
                return Ok(Stability::Stable {
                    temperature_k,
                    rms_uk,
                    polls,
                    elapsed,
                });
            }
            if polls < limit {
                self.clock.sleep(poll);
            }
        }

        let elapsed = self.clock.now().saturating_duration_since(start);
        warn!(
            setpoint_k,
            temperature_k,
            polls = limit,
            ?elapsed,
            "temperature not stable before timeout"
        );
        Ok(Stability::TimedOut {
            temperature_k,
            rms_uk,
            polls: limit,
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poll_count_includes_the_first_read() {
        assert_eq!(
            max_polls(Duration::from_secs(180), Duration::from_secs(10)),
            19
        );
        assert_eq!(
            max_polls(Duration::from_secs(25), Duration::from_secs(10)),
            3
        );
    }
}
