use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("adr.toml");
    fs::write(&path, body).unwrap();
    path
}

// Zero settle waits and a short stability window keep the simulated
// session quick to read in assertions.
const FAST_CONFIG: &str = r#"
[servo]
channel = 1
base_resistance_ohm = 60000.0

[settle]
ramp_ms = 0
scan_ms = 0
read_channel_ms = 0
control_ms = 0
setpoint_ms = 0

[stability]
tolerance_k = 0.0005
timeout_s = 180
poll_s = 10

[card]
address = 32
"#;

fn adrctl() -> Command {
    let mut cmd = Command::cargo_bin("adrctl").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["encode", "--word", "0x7f", "--address", "1"], 0, "fe 00 00 00 03", "stdout")]
#[case(&["decode", "fe", "00", "00", "00", "03"], 0, "address=1", "stdout")]
#[case(&["classify", "60000", "--factor", "1.1"], 0, "low=16 high=17", "stdout")]
#[case(&["classify", "15"], 0, "9", "stdout")]
#[case(&["classify", "--", "-1"], 3, "must be", "stderr")]
#[case(&["encode", "--word", "1", "--address", "200"], 4, "does not fit in 7 bits", "stderr")]
#[case(&["encode", "--word", "0x10000000", "--address", "1"], 4, "28 bits", "stderr")]
#[case(&["decode", "fe", "00", "00", "03"], 4, "expected 5 bytes, got 4", "stderr")]
#[case(&["decode", "fe", "01", "00", "00", "03"], 4, "Malformed frame", "stderr")]
#[case(&["encode"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = adrctl().args(args).assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn decode_prints_word_and_address() {
    adrctl()
        .args(["decode", "0xfe", "0x00", "0x00", "0x00", "0x03"])
        .assert()
        .success()
        .stdout(predicate::str::contains("word=0x000007f (127) address=1"));
}

#[rstest]
#[case("[stability]\ntimeout_s = 5\npoll_s = 10\n", "stability.timeout_s")]
#[case("[card]\naddress = 300\n", "parse")]
#[case("[servo\nchannel = 1\n", "parse")]
#[case("[servo]\nhysteresis_factor = 0.5\n", "hysteresis_factor")]
fn bad_config_exits_with_config_code(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, body);
    adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["classify", "100"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains(needle));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempdir().unwrap();
    adrctl()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .args(["classify", "100"])
        .assert()
        .code(5);
}

#[test]
fn json_errors_are_structured() {
    let out = adrctl()
        .args(["--json", "classify", "--", "-5"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    assert_eq!(v["reason"], "InvalidValue");
    assert_eq!(v["exit_code"], 3);
}

#[test]
fn encode_uses_card_address_from_config() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let out = adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "encode", "--word", "0x7f"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["address"], 32);
    assert_eq!(v["hex"], "fe 00 00 00 41");
}

#[test]
fn bad16_triangle_sends_legacy_word_on_simulated_bus() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["bad16", "triangle"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 00 50 20 41"));
}

#[test]
fn bad16_globals_with_init_sends_two_frames() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let out = adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "bad16", "globals", "--init"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["frames"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["frames_sent"], 2);
}

#[test]
fn bad16_rejects_wide_delay() {
    adrctl()
        .args(["bad16", "globals", "--delay", "16"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("wreg0.delay"));
}

#[test]
fn servo_session_settles_in_simulation() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["servo", "--target", "0.05", "--start", "0.1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("setup: applied"))
        .stdout(predicate::str::contains("autorange: hold at 16"))
        .stdout(predicate::str::contains("settle: stable"));
}

#[test]
fn servo_refuses_setup_with_heater_on() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["servo", "--heater", "40"])
        .assert()
        .success()
        .stdout(predicate::str::contains("heater output is 40"));
}

#[test]
fn servo_json_reports_noisy_timeout() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, FAST_CONFIG);
    let out = adrctl()
        .arg("--config")
        .arg(&cfg)
        .args(["--json", "servo", "--rms-uk", "5000"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["setup"]["applied"], true);
    assert_eq!(v["settle"]["stable"], false);
    assert_eq!(v["settle"]["polls"], 19);
}

#[test]
fn servo_rejects_negative_target() {
    adrctl()
        .args(["servo", "--target=-1"])
        .assert()
        .code(3);
}

#[test]
fn demags_lists_cycle_ends() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("heater.csv");
    fs::write(
        &log,
        "label,time,temp,heater\n\
         a,100,3.1,0\n\
         a,110,3.0,90\n\
         a,120,2.9,95\n\
         a,130,0.1,0\n",
    )
    .unwrap();
    adrctl()
        .arg("demags")
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("120.0\t2.9000\t95.0"));
}

#[test]
fn demags_reports_bad_rows() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("heater.csv");
    fs::write(&log, "label,time,temp,heater\na,100,3.1\n").unwrap();
    adrctl()
        .arg("demags")
        .arg(&log)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 4 columns"));
}
