use adr_config::load_heater_log_csv;
use std::fs::File;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn loads_rows_skipping_label_column() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("hortonlog_a.csv");
    let mut f = File::create(&path).expect("create");
    writeln!(f, "label,time,temp,heater").unwrap();
    writeln!(f, "a,1000.0,3.5,90.0").unwrap();
    writeln!(f, "a, 1010.0 , 3.4 , 20.0").unwrap();
    drop(f);

    let rows = load_heater_log_csv(&path).expect("load");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].time_s, 1000.0);
    assert_eq!(rows[0].temperature_k, 3.5);
    assert_eq!(rows[1].heater_out, 20.0);
}

#[test]
fn header_only_log_is_empty() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("hortonlog_empty.csv");
    std::fs::write(&path, "label,time,temp,heater\n").expect("write");
    let rows = load_heater_log_csv(&path).expect("load");
    assert!(rows.is_empty());
}

#[test]
fn reports_row_number_for_bad_value() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("hortonlog_bad.csv");
    std::fs::write(&path, "label,time,temp,heater\na,1,2,3\na,2,oops,3\n").expect("write");
    let err = load_heater_log_csv(&path).expect_err("bad float");
    let msg = format!("{err}");
    assert!(msg.contains("row 3"), "unexpected message: {msg}");
}

#[test]
fn reports_short_rows() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("hortonlog_short.csv");
    std::fs::write(&path, "label,time,temp,heater\na,1,2\n").expect("write");
    let err = load_heater_log_csv(&path).expect_err("short row");
    assert!(format!("{err}").contains("expected 4 columns"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let err = load_heater_log_csv(&dir.path().join("nope.csv")).expect_err("missing");
    assert!(format!("{err}").contains("open heater log"));
}
