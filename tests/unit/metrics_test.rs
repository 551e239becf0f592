//! Unit tests for the training metrics calculator.

use veloce::metrics::{
    average_power, intensity_factor, normalized_power, summarize, total_work_joules,
    training_stress_score, variability_index,
};
use veloce::{PowerZones, WorkoutDataPoint};

fn steady_points(power: i16, secs: usize) -> Vec<WorkoutDataPoint> {
    (0..secs)
        .map(|i| WorkoutDataPoint {
            timestamp_ms: i as i64 * 1000,
            power,
            heart_rate: 140,
            cadence: 90,
        })
        .collect()
}

#[test]
fn test_normalized_power_steady_equals_average() {
    let powers = vec![200u16; 120];
    assert_eq!(normalized_power(&powers), 200);
    assert_eq!(average_power(&powers), 200);
}

#[test]
fn test_normalized_power_short_ride_is_zero() {
    // Fewer samples than the 30-second window.
    let powers = vec![200u16; 29];
    assert_eq!(normalized_power(&powers), 0);
}

#[test]
fn test_normalized_power_weights_spikes() {
    // Alternating 100W/300W averages 200W, but the fourth-power mean
    // rewards the spikes.
    let powers: Vec<u16> = (0..300).map(|i| if i % 2 == 0 { 100 } else { 300 }).collect();
    let np = normalized_power(&powers);
    assert!(np > average_power(&powers));
}

#[test]
fn test_intensity_factor() {
    assert!((intensity_factor(200, 200) - 1.0).abs() < f64::EPSILON);
    assert!((intensity_factor(160, 200) - 0.8).abs() < f64::EPSILON);
    assert!((intensity_factor(200, 0) - 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_tss_hour_at_threshold_is_100() {
    let tss = training_stress_score(3600, 200, 1.0, 200);
    assert!((tss - 100.0).abs() < f64::EPSILON);
}

#[test]
fn test_tss_half_hour_tempo() {
    // 1800s at NP 160 with FTP 200: IF 0.8, TSS 32.0
    let tss = training_stress_score(1800, 160, 0.8, 200);
    assert!((tss - 32.0).abs() < f64::EPSILON);
}

#[test]
fn test_variability_index() {
    assert!((variability_index(210, 200) - 1.05).abs() < f64::EPSILON);
    assert!((variability_index(210, 0) - 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_total_work_steady_hour() {
    // 200W held for an hour is 720 kJ.
    let points = steady_points(200, 3601);
    assert_eq!(total_work_joules(&points), 720_000);
}

#[test]
fn test_total_work_clamps_negative_power() {
    let mut points = steady_points(200, 10);
    points[5].power = -400;
    let work = total_work_joules(&points);
    // Never reduced below what the surrounding samples contribute.
    assert!(work < 9 * 200);
    assert!(work > 0);
}

#[test]
fn test_summarize_sub_window_ride() {
    // Rides shorter than the NP window still summarize; the NP-derived
    // metrics are all zero.
    let points = steady_points(200, 20);
    let summary = summarize(&points, 200);

    assert_eq!(summary.duration_secs, 20);
    assert_eq!(summary.average_power, 200);
    assert_eq!(summary.normalized_power, 0);
    assert!((summary.intensity_factor - 0.0).abs() < f64::EPSILON);
    assert!((summary.training_stress_score - 0.0).abs() < f64::EPSILON);
    assert!((summary.variability_index - 0.0).abs() < f64::EPSILON);
}

#[test]
fn test_summarize_clamps_negative_power_in_averages() {
    let mut points = steady_points(200, 40);
    for p in points.iter_mut().take(10) {
        p.power = -20;
    }
    let summary = summarize(&points, 200);
    // 10 samples clamp to 0: (30 * 200) / 40 = 150
    assert_eq!(summary.average_power, 150);
}

#[test]
fn test_power_zones_track_ftp() {
    let zones = PowerZones::from_ftp(250);

    // Sweet spot work around 90% of FTP sits in tempo.
    assert_eq!(zones.zone_for(225), 3);
    // FTP itself is threshold.
    assert_eq!(zones.zone_for(250), 4);

    let threshold = zones.range(4).unwrap();
    assert_eq!(threshold.min_watts, 228);
    assert_eq!(threshold.max_watts, 263);
}
