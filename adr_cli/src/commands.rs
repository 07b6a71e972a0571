//! Subcommand implementations: config mapping, hardware assembly, output.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use adr_core::error::{AdrError, Result};
use adr_core::health::collect_demag_ends;
use adr_core::{
    AutorangeDecision, Bad16Card, CardAddress, SerialFrame, ServoStatus, Settle, SettledBus,
    Stability, TempServo, Wreg0, Wreg1, classify, classify_with_hysteresis, decode, encode,
};
use adr_hardware::{SimulatedBridge, SimulatedRelay};
use adr_traits::{BusWriter, ManualClock, MonotonicClock};
use eyre::WrapErr;
use serde_json::json;

use crate::cli::Bad16Cmd;

pub fn run_encode(
    cfg: &adr_config::Config,
    word: u32,
    address: Option<u8>,
    json: bool,
) -> Result<()> {
    let address = address.unwrap_or(cfg.card.address);
    let frame = encode(word, address)?;
    tracing::debug!(word, address, frame = %frame, "encoded");
    if json {
        println!(
            "{}",
            json!({
                "word": word,
                "address": address,
                "frame": frame.as_bytes(),
                "hex": frame.to_string(),
            })
        );
    } else {
        println!("{frame}");
    }
    Ok(())
}

pub fn run_decode(bytes: &[u8], json: bool) -> Result<()> {
    let frame = SerialFrame::try_from(bytes)?;
    let (word, address) = decode(&frame)?;
    if json {
        println!("{}", json!({ "word": word, "address": address }));
    } else {
        println!("word=0x{word:07x} ({word}) address={address}");
    }
    Ok(())
}

pub fn run_classify(ohms: f64, factor: Option<f64>, json: bool) -> Result<()> {
    match factor {
        None => {
            let code = classify(ohms)?;
            if json {
                println!("{}", json!({ "ohms": ohms, "range": code.get() }));
            } else {
                println!("{code}");
            }
        }
        Some(f) => {
            let (low, high) = classify_with_hysteresis(ohms, f)?;
            if json {
                println!(
                    "{}",
                    json!({ "ohms": ohms, "factor": f, "low": low.get(), "high": high.get() })
                );
            } else {
                println!("low={low} high={high}");
            }
        }
    }
    Ok(())
}

/// Open the configured bus: the serial port when one is configured and the
/// build supports it, the record-only simulation otherwise.
fn open_bus(cfg: &adr_config::BusCfg) -> Result<Box<dyn BusWriter>> {
    match &cfg.port {
        #[cfg(feature = "hardware")]
        Some(port) => {
            let bus = adr_hardware::SerialBus::open(port, cfg.baud)
                .map_err(|e| AdrError::Hardware(e.to_string()))
                .wrap_err_with(|| format!("open serial bus {port}"))?;
            Ok(Box::new(bus))
        }
        #[cfg(not(feature = "hardware"))]
        Some(port) => {
            tracing::warn!(
                port = %port,
                "built without the hardware feature; using the simulated bus"
            );
            Ok(Box::new(adr_hardware::SimulatedBus::new()))
        }
        None => Ok(Box::new(adr_hardware::SimulatedBus::new())),
    }
}

fn frame_list(frames: &[SerialFrame]) -> Vec<String> {
    frames.iter().map(ToString::to_string).collect()
}

pub fn run_bad16(cfg: &adr_config::Config, cmd: &Bad16Cmd, json: bool) -> Result<()> {
    let address = CardAddress::new(cfg.card.address)?;
    let bus = SettledBus::new(
        open_bus(&cfg.bus)?,
        Arc::new(MonotonicClock::new()),
        Duration::from_millis(cfg.bus.frame_gap_ms),
    );
    let globals = Wreg0 {
        seqln: cfg.card.seqln,
        delay: cfg.card.delay,
        ..Wreg0::default()
    };
    let mut card = Bad16Card::new(address, cfg.card.slot, bus).with_globals(globals);

    let mut sent = Vec::new();
    match *cmd {
        Bad16Cmd::Globals {
            led_off,
            status,
            seqln,
            delay,
            init,
        } => {
            card.set_led_off(led_off);
            card.set_status(status);
            if let Some(n) = seqln {
                card.set_seqln(n);
            }
            if let Some(d) = delay {
                card.set_delay(d)?;
            }
            sent.push(card.send_globals()?);
            if let Some(frame) = card.init_memory(init)? {
                sent.push(frame);
            }
        }
        Bad16Cmd::Triangle { dwell, steps, step } => {
            sent.push(card.send_triangle(Wreg1 { dwell, steps, step })?);
        }
    }

    if json {
        println!(
            "{}",
            json!({
                "address": address.get(),
                "slot": card.slot(),
                "frames": frame_list(&sent),
                "frames_sent": card.bus().frames_sent(),
            })
        );
    } else {
        for f in &sent {
            println!("{f}");
        }
    }
    Ok(())
}

/// Knobs for the simulated servo session.
pub struct ServoRun {
    pub target: f64,
    pub tolerance: Option<f64>,
    pub timeout_s: Option<u64>,
    pub start: f64,
    pub heater: f64,
    pub resistance: Option<f64>,
    pub range: Option<String>,
    pub rms_uk: f64,
}

fn status_json(s: &ServoStatus) -> serde_json::Value {
    json!({ "applied": s.is_applied(), "message": s.message() })
}

fn autorange_json(d: &AutorangeDecision) -> serde_json::Value {
    match d {
        AutorangeDecision::Hold { now } => json!({ "changed": false, "range": now.get() }),
        AutorangeDecision::Changed { from, to } => {
            json!({ "changed": true, "from": from.get(), "to": to.get() })
        }
    }
}

fn stability_json(s: &Stability) -> serde_json::Value {
    let (stable, rms_uk, elapsed) = match *s {
        Stability::Stable {
            rms_uk, elapsed, ..
        } => (true, rms_uk, elapsed),
        Stability::TimedOut {
            rms_uk, elapsed, ..
        } => (false, rms_uk, elapsed),
    };
    json!({
        "stable": stable,
        "temperature_k": s.temperature_k(),
        "rms_uk": rms_uk,
        "polls": s.polls(),
        "elapsed_s": elapsed.as_secs_f64(),
    })
}

/// Control setup, one autorange pass and a settle to `target`, all against
/// the simulated bridge on a manual clock so no real time passes.
pub fn run_servo(cfg: &adr_config::Config, run: ServoRun, json: bool) -> Result<()> {
    let mut bridge = SimulatedBridge::new().with_control_channel(cfg.servo.channel);
    bridge.set_temperature(run.start);
    bridge.set_heater(run.heater);
    bridge.set_rms_uk(run.rms_uk);
    bridge.set_resistance(run.resistance.unwrap_or(cfg.servo.base_resistance_ohm));
    if let Some(r) = &run.range {
        bridge.set_range(r.clone());
    }

    let clock = ManualClock::new();
    let mut servo = TempServo::builder()
        .with_controller(bridge)
        .with_relay(SimulatedRelay::new())
        .with_servo_cfg((&cfg.servo).into())
        .with_settle((&cfg.settle).into())
        .with_stability((&cfg.stability).into())
        .with_clock(Box::new(clock.clone()))
        .build()?;

    let tolerance = run.tolerance.unwrap_or(cfg.stability.tolerance_k);
    let timeout = Duration::from_secs(run.timeout_s.unwrap_or(cfg.stability.timeout_s));

    let setup = servo.setup_temp_control()?;
    if !setup.is_applied() {
        tracing::warn!(reason = %setup.message(), "control setup rejected");
        if json {
            println!("{}", json!({ "setup": status_json(&setup) }));
        } else {
            println!("setup: {}", setup.message());
        }
        return Ok(());
    }

    let autorange = servo.safe_autorange()?;
    let settle = servo
        .set_temp_and_settle(run.target, tolerance, timeout)
        .wrap_err("settle at target")?;

    let sim_elapsed = clock.elapsed();
    if json {
        let settle_json = match &settle {
            Settle::Rejected(s) => json!({ "rejected": status_json(s) }),
            Settle::Waited(st) => stability_json(st),
        };
        println!(
            "{}",
            json!({
                "setup": status_json(&setup),
                "autorange": autorange_json(&autorange),
                "settle": settle_json,
                "simulated_s": sim_elapsed.as_secs_f64(),
            })
        );
    } else {
        println!("setup: {}", setup.message());
        match autorange {
            AutorangeDecision::Hold { now } => println!("autorange: hold at {now}"),
            AutorangeDecision::Changed { from, to } => println!("autorange: {from} -> {to}"),
        }
        match settle {
            Settle::Rejected(s) => println!("settle: {}", s.message()),
            Settle::Waited(st) => {
                let verdict = if st.is_stable() { "stable" } else { "not stable" };
                println!(
                    "settle: {verdict} at {:.4} K after {} polls ({:.0} s simulated)",
                    st.temperature_k(),
                    st.polls(),
                    sim_elapsed.as_secs_f64()
                );
            }
        }
    }
    Ok(())
}

pub fn run_demags(
    cfg: &adr_config::Config,
    logs: &[PathBuf],
    magup_max: Option<f64>,
    json: bool,
) -> Result<()> {
    let magup_max = magup_max.unwrap_or(cfg.health.magup_max);
    if !magup_max.is_finite() {
        return Err(AdrError::InvalidValue(format!(
            "magup max must be finite, got {magup_max}"
        ))
        .into());
    }

    let mut loaded = Vec::with_capacity(logs.len());
    for path in logs {
        let rows = adr_config::load_heater_log_csv(path)?;
        tracing::debug!(path = %path.display(), rows = rows.len(), "heater log loaded");
        loaded.push(rows);
    }
    let ends = collect_demag_ends(loaded.iter().map(Vec::as_slice), magup_max);
    tracing::info!(logs = logs.len(), demags = ends.len(), magup_max, "demag scan done");

    if json {
        let rows: Vec<_> = ends
            .iter()
            .map(|r| {
                json!({
                    "time_s": r.time_s,
                    "temperature_k": r.temperature_k,
                    "heater_out": r.heater_out,
                })
            })
            .collect();
        println!("{}", json!({ "magup_max": magup_max, "demags": rows }));
    } else {
        for r in &ends {
            println!("{:.1}\t{:.4}\t{:.1}", r.time_s, r.temperature_k, r.heater_out);
        }
    }
    Ok(())
}
