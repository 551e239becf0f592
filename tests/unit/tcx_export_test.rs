//! Unit tests for TCX export through the public API.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use veloce::metrics::summarize;
use veloce::recording::exporter_tcx::{export_tcx, generate_tcx_filename};
use veloce::workout::parser_tcx::parse_tcx;
use veloce::{RideRecord, WorkoutDataPoint};

fn record_with_points(points: Vec<WorkoutDataPoint>) -> RideRecord {
    let started_at = points
        .first()
        .and_then(|p| DateTime::from_timestamp_millis(p.timestamp_ms))
        .unwrap_or_else(Utc::now);
    let finished_at = points
        .last()
        .and_then(|p| DateTime::from_timestamp_millis(p.timestamp_ms))
        .unwrap_or_else(Utc::now);
    let summary = summarize(&points, 200);

    RideRecord {
        session: Uuid::new_v4(),
        workout_id: Uuid::new_v4(),
        workout_name: "Tempo Blocks".to_string(),
        started_at,
        finished_at,
        points,
        summary,
    }
}

fn ride_points(count: usize) -> Vec<WorkoutDataPoint> {
    let base_ms = DateTime::parse_from_rfc3339("2025-07-10T06:30:00Z")
        .unwrap()
        .timestamp_millis();
    (0..count)
        .map(|i| WorkoutDataPoint {
            timestamp_ms: base_ms + i as i64 * 1000,
            power: 210,
            heart_rate: 148,
            cadence: 92,
        })
        .collect()
}

#[test]
fn test_exported_ride_reimports_identically() {
    let record = record_with_points(ride_points(90));
    let xml = export_tcx(&record).unwrap();

    let reimported = parse_tcx(&xml).unwrap();
    assert_eq!(reimported.len(), record.points.len());
    assert_eq!(reimported.first(), record.points.first());
    assert_eq!(reimported.last(), record.points.last());
}

#[test]
fn test_zero_readings_are_omitted_from_trackpoints() {
    let mut points = ride_points(3);
    points[1].heart_rate = 0;
    points[1].cadence = 0;
    let record = record_with_points(points);

    let xml = export_tcx(&record).unwrap();
    // Two trackpoints carry HR and cadence, one carries neither.
    assert_eq!(xml.matches("<HeartRateBpm>").count(), 2);
    assert_eq!(xml.matches("<Cadence>").count(), 2);
    // Watts are always written.
    assert_eq!(xml.matches("<ns3:Watts>").count(), 3);
}

#[test]
fn test_negative_power_exports_as_zero() {
    let mut points = ride_points(2);
    points[0].power = -15;
    let record = record_with_points(points);

    let xml = export_tcx(&record).unwrap();
    assert!(xml.contains("<ns3:Watts>0</ns3:Watts>"));
    assert!(!xml.contains("-15"));
}

#[test]
fn test_notes_carry_workout_name() {
    let record = record_with_points(ride_points(1));
    let xml = export_tcx(&record).unwrap();
    assert!(xml.contains("<Notes>Tempo Blocks</Notes>"));
}

#[test]
fn test_filename_derives_from_start_time() {
    let record = record_with_points(ride_points(1));
    assert_eq!(generate_tcx_filename(&record), "Veloce_20250710_063000.tcx");
}
