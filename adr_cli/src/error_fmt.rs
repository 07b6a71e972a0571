//! Human-readable error descriptions and structured JSON error formatting.

use adr_core::error::{AdrError, BuildError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingController => {
                "What happened: No temperature controller was provided to the servo.\nLikely causes: The bridge failed to initialize or was not wired into the builder.\nHow to fix: Ensure the controller is created successfully and passed via with_controller(...).".to_string()
            }
            BuildError::MissingRelay => {
                "What happened: No magnet relay was provided to the servo.\nLikely causes: The relay driver failed to initialize or was not wired into the builder.\nHow to fix: Ensure the relay is created successfully and passed via with_relay(...).".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid servo configuration ({msg}).\nLikely causes: Out-of-range values in the [servo] or [stability] sections.\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(ae) = err.downcast_ref::<AdrError>() {
        return match ae {
            AdrError::InvalidValue(msg) => format!(
                "What happened: {msg}.\nLikely causes: A negative, NaN or infinite number was passed in.\nHow to fix: Pass a finite, non-negative value."
            ),
            AdrError::Range { field, value, bits } => format!(
                "What happened: {field} = {value} does not fit in {bits} bits.\nLikely causes: Wrong units or a value meant for a different register.\nHow to fix: Use a value below {}.",
                1u64 << bits
            ),
            AdrError::MalformedFrame(msg) => format!(
                "What happened: Malformed frame ({msg}).\nLikely causes: Bytes out of order, a truncated capture, or a frame from another bus.\nHow to fix: Pass exactly five bytes; only the last may have bit 0 set."
            ),
            AdrError::Config(msg) => format!(
                "What happened: Configuration error ({msg}).\nLikely causes: A missing or out-of-range value in the TOML or on the command line.\nHow to fix: Edit the config file or arguments, then rerun."
            ),
            AdrError::Timeout => {
                "What happened: The bridge did not answer in time.\nLikely causes: Cable unplugged, instrument busy, or wrong serial port.\nHow to fix: Check the connection and [bus].port, then rerun.".to_string()
            }
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // Generic fallback
    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 invalid value, 4 range/frame, 5 configuration, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if let Some(BuildError::InvalidConfig(_)) = err.downcast_ref::<BuildError>() {
        return 5;
    }
    match err.downcast_ref::<AdrError>() {
        Some(AdrError::InvalidValue(_)) => 3,
        Some(AdrError::Range { .. } | AdrError::MalformedFrame(_)) => 4,
        Some(AdrError::Config(_)) => 5,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "BuildError";
    }
    match err.downcast_ref::<AdrError>() {
        Some(AdrError::InvalidValue(_)) => "InvalidValue",
        Some(AdrError::Range { .. }) => "Range",
        Some(AdrError::MalformedFrame(_)) => "MalformedFrame",
        Some(AdrError::PreconditionFailed(_)) => "PreconditionFailed",
        Some(AdrError::Config(_)) => "Config",
        Some(AdrError::Hardware(_)) => "Hardware",
        Some(AdrError::Timeout) => "Timeout",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
