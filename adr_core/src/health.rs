//! Demag-cycle detection in heater-output logs.
//!
//! During a mag-up the heater output sits above `magup_max`; the cycle ends
//! at the last sample before it falls back to or below that level.

use adr_config::HeaterLogRow;

/// Heater output above which the magnet is considered ramping up.
pub const DEFAULT_MAGUP_MAX: f64 = 85.0;

/// Rows that are the last sample above `magup_max` before a falling edge.
pub fn find_demag_ends(rows: &[HeaterLogRow], magup_max: f64) -> Vec<HeaterLogRow> {
    rows.windows(2)
        .filter(|w| w[0].heater_out > magup_max && w[1].heater_out <= magup_max)
        .map(|w| w[0])
        .collect()
}

pub fn sort_by_time(rows: &mut [HeaterLogRow]) {
    rows.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
}

/// Demag ends across several logs, ordered by time. Logs with fewer than two
/// rows cannot contain an edge and are skipped.
pub fn collect_demag_ends<'a, I>(logs: I, magup_max: f64) -> Vec<HeaterLogRow>
where
    I: IntoIterator<Item = &'a [HeaterLogRow]>,
{
    let mut ends: Vec<HeaterLogRow> = logs
        .into_iter()
        .filter(|rows| rows.len() >= 2)
        .flat_map(|rows| find_demag_ends(rows, magup_max))
        .collect();
    sort_by_time(&mut ends);
    ends
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(t: f64, h: f64) -> HeaterLogRow {
        HeaterLogRow {
            time_s: t,
            temperature_k: 0.1,
            heater_out: h,
        }
    }

    #[test]
    fn finds_falling_edges_only() {
        let log = [
            row(0.0, 0.0),
            row(1.0, 90.0),
            row(2.0, 100.0),
            row(3.0, 85.0),
            row(4.0, 0.0),
            row(5.0, 86.0),
            row(6.0, 10.0),
        ];
        let ends = find_demag_ends(&log, DEFAULT_MAGUP_MAX);
        let times: Vec<f64> = ends.iter().map(|r| r.time_s).collect();
        assert_eq!(times, vec![2.0, 5.0]);
    }

    #[test]
    fn log_ending_high_has_no_end() {
        let log = [row(0.0, 0.0), row(1.0, 100.0)];
        assert!(find_demag_ends(&log, DEFAULT_MAGUP_MAX).is_empty());
    }

    #[test]
    fn collect_skips_short_logs_and_sorts() {
        let late = vec![row(50.0, 100.0), row(51.0, 0.0)];
        let single = vec![row(1.0, 100.0)];
        let early = vec![row(10.0, 100.0), row(11.0, 0.0)];
        let ends = collect_demag_ends(
            [late.as_slice(), single.as_slice(), early.as_slice()],
            DEFAULT_MAGUP_MAX,
        );
        let times: Vec<f64> = ends.iter().map(|r| r.time_s).collect();
        assert_eq!(times, vec![10.0, 50.0]);
    }
}
