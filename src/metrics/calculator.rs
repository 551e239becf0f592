//! Pure power-metrics math over recorded sample series.
//!
//! All functions take slices and return plain values; nothing here touches
//! devices, time or IO.

use crate::recording::types::{RideSummary, WorkoutDataPoint};

/// Window length for normalized power, in samples (30 s at 1 Hz).
const NP_WINDOW: usize = 30;

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalized power over a 1 Hz power series.
///
/// Sliding 30-sample window means, each raised to the fourth power, averaged,
/// fourth root, rounded to whole watts. Fewer than 30 samples is too short
/// for the window and yields 0.
pub fn normalized_power(powers: &[u16]) -> u16 {
    if powers.len() < NP_WINDOW {
        return 0;
    }

    let mut fourth_power_sum = 0.0f64;
    let window_count = powers.len() - NP_WINDOW + 1;

    let mut window_sum: u32 = powers[..NP_WINDOW].iter().map(|&p| p as u32).sum();
    fourth_power_sum += (window_sum as f64 / NP_WINDOW as f64).powi(4);

    for i in NP_WINDOW..powers.len() {
        window_sum += powers[i] as u32;
        window_sum -= powers[i - NP_WINDOW] as u32;
        fourth_power_sum += (window_sum as f64 / NP_WINDOW as f64).powi(4);
    }

    (fourth_power_sum / window_count as f64).powf(0.25).round() as u16
}

/// Intensity factor: NP / FTP, 2 decimal places. 0 when FTP is unset.
pub fn intensity_factor(np: u16, ftp: u16) -> f64 {
    if ftp == 0 {
        return 0.0;
    }
    round2(np as f64 / ftp as f64)
}

/// Training stress score, 1 decimal place. 0 when FTP is unset.
///
/// One hour at IF 1.0 scores exactly 100.
pub fn training_stress_score(duration_secs: u32, np: u16, intensity: f64, ftp: u16) -> f64 {
    if ftp == 0 {
        return 0.0;
    }
    let raw =
        (duration_secs as f64 * np as f64 * intensity) / (ftp as f64 * 3600.0) * 100.0;
    round1(raw)
}

/// Variability index: NP / average power, 2 decimal places. 0 when the
/// average is 0.
pub fn variability_index(np: u16, avg_power: u16) -> f64 {
    if avg_power == 0 {
        return 0.0;
    }
    round2(np as f64 / avg_power as f64)
}

/// Arithmetic mean power, rounded to whole watts.
pub fn average_power(powers: &[u16]) -> u16 {
    if powers.is_empty() {
        return 0;
    }
    let sum: u64 = powers.iter().map(|&p| p as u64).sum();
    (sum as f64 / powers.len() as f64).round() as u16
}

/// Total mechanical work in joules, trapezoidal over sample timestamps.
pub fn total_work_joules(points: &[WorkoutDataPoint]) -> u64 {
    let mut joules = 0.0f64;

    for pair in points.windows(2) {
        let dt_secs = (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64 / 1000.0;
        if dt_secs <= 0.0 {
            continue;
        }
        let p0 = pair[0].power.max(0) as f64;
        let p1 = pair[1].power.max(0) as f64;
        joules += (p0 + p1) / 2.0 * dt_secs;
    }

    joules.round() as u64
}

/// Compute the full ride summary for a recorded series.
pub fn summarize(points: &[WorkoutDataPoint], ftp: u16) -> RideSummary {
    let powers: Vec<u16> = points.iter().map(|p| p.power.max(0) as u16).collect();

    let duration_secs = points.len() as u32;
    let avg = average_power(&powers);
    let np = normalized_power(&powers);
    let intensity = intensity_factor(np, ftp);

    RideSummary {
        duration_secs,
        total_work_joules: total_work_joules(points),
        average_power: avg,
        normalized_power: np,
        intensity_factor: intensity,
        training_stress_score: training_stress_score(duration_secs, np, intensity, ftp),
        variability_index: variability_index(np, avg),
    }
}
