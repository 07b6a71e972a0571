use std::time::Duration;

use adr_core::{AdrError, Settle, SettleCfg, Stability, StabilityCfg, TempServo};
use adr_hardware::{SimulatedBridge, SimulatedRelay};
use adr_traits::{ManualClock, TemperatureController};
use rstest::rstest;

fn servo(bridge: SimulatedBridge, clock: &ManualClock) -> TempServo<SimulatedBridge, SimulatedRelay> {
    TempServo::builder()
        .with_controller(bridge)
        .with_relay(SimulatedRelay::new())
        .with_settle(SettleCfg::immediate())
        .with_stability(StabilityCfg::default())
        .with_clock(Box::new(clock.clone()))
        .build()
        .expect("valid servo")
}

#[rstest]
#[case::equal_to_poll(Duration::from_secs(10))]
#[case::shorter_than_poll(Duration::from_secs(5))]
fn timeout_not_above_poll_is_config_error(#[case] timeout: Duration) {
    let clock = ManualClock::new();
    let mut s = servo(SimulatedBridge::new(), &clock);
    let err = s.wait_stable(0.035, 0.0005, timeout).expect_err("config error");
    assert!(matches!(
        err.downcast_ref::<AdrError>(),
        Some(AdrError::Config(_))
    ));
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[rstest]
#[case(0.0)]
#[case(-1e-3)]
#[case(f64::NAN)]
fn non_positive_tolerance_is_config_error(#[case] tol: f64) {
    let clock = ManualClock::new();
    let mut s = servo(SimulatedBridge::new(), &clock);
    let err = s
        .wait_near_setpoint(0.035, tol, Duration::from_secs(60))
        .expect_err("config error");
    assert!(matches!(
        err.downcast_ref::<AdrError>(),
        Some(AdrError::Config(_))
    ));
}

#[test]
fn already_at_setpoint_is_stable_on_first_poll() {
    let clock = ManualClock::new();
    let mut bridge = SimulatedBridge::new();
    bridge.set_temperature(0.035);
    bridge.set_rms_uk(20.0);
    let mut s = servo(bridge, &clock);

    let st = s
        .wait_stable(0.035, 0.0005, Duration::from_secs(180))
        .unwrap();
    match st {
        Stability::Stable {
            polls,
            rms_uk,
            elapsed,
            ..
        } => {
            assert_eq!(polls, 1);
            assert_eq!(rms_uk, Some(20.0));
            assert_eq!(elapsed, Duration::ZERO);
        }
        other => panic!("expected stable, got {other:?}"),
    }
}

#[test]
fn noisy_reading_times_out_after_max_polls() {
    let clock = ManualClock::new();
    let mut bridge = SimulatedBridge::new();
    bridge.set_temperature(0.035);
    // 600 uK is above the 500 uK limit for a 0.5 mK tolerance.
    bridge.set_rms_uk(600.0);
    let mut s = servo(bridge, &clock);

    let st = s
        .wait_stable(0.035, 0.0005, Duration::from_secs(180))
        .unwrap();
    assert!(!st.is_stable());
    assert_eq!(st.polls(), 19);
    // 19 polls, 18 sleeps in between.
    assert_eq!(clock.elapsed(), Duration::from_secs(180));
}

#[test]
fn temperature_only_check_ignores_noise() {
    let clock = ManualClock::new();
    let mut bridge = SimulatedBridge::new();
    bridge.set_temperature(0.035);
    bridge.set_rms_uk(600.0);
    let mut s = servo(bridge, &clock);

    let st = s
        .wait_near_setpoint(0.035, 0.0005, Duration::from_secs(30))
        .unwrap();
    assert!(st.is_stable());
    if let Stability::Stable { rms_uk, .. } = st {
        assert_eq!(rms_uk, None);
    }
}

#[test]
fn set_temp_and_settle_converges_under_closed_loop() {
    let clock = ManualClock::new();
    let mut bridge = SimulatedBridge::new();
    bridge.set_temperature(0.1);
    bridge.set_approach(0.5);
    let mut s = servo(bridge, &clock);
    s.setup_temp_control().unwrap();

    let outcome = s
        .set_temp_and_settle(0.05, 0.0005, Duration::from_secs(300))
        .unwrap();
    let Settle::Waited(st) = outcome else {
        panic!("expected a wait, got {outcome:?}");
    };
    assert!(st.is_stable(), "{st:?}");
    assert!((st.temperature_k() - 0.05).abs() < 0.0005);
    assert!(st.polls() > 1);
    assert!((s.controller_mut().temperature_setpoint().unwrap() - 0.05).abs() < 1e-12);
}

#[test]
fn set_temp_and_settle_before_control_is_rejected() {
    let clock = ManualClock::new();
    let mut s = servo(SimulatedBridge::new(), &clock);
    let outcome = s
        .set_temp_and_settle(0.05, 0.0005, Duration::from_secs(60))
        .unwrap();
    assert!(matches!(outcome, Settle::Rejected(_)));
    assert_eq!(clock.elapsed(), Duration::ZERO);
}
