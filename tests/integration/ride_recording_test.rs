//! Integration tests for ride recording and export.
//!
//! Runs sessions against the real TCX file sink and checks the exported
//! activity on disk.

use std::sync::{Arc, Mutex};

use crossbeam::channel::{unbounded, Sender};
use veloce::recording::exporter_tcx::TcxFileSink;
use veloce::workout::parser_tcx::parse_tcx;
use veloce::{
    Interval, IntervalKind, TelemetryCell, TelemetryEvent, TrainerControl, Workout,
    WorkoutTimeline,
};

struct NullTrainer {
    last: Mutex<i16>,
}

impl TrainerControl for NullTrainer {
    fn set_target_power(&self, watts: i16) {
        *self.last.lock().unwrap() = watts;
    }
}

fn session_with_sink(
    export_dir: std::path::PathBuf,
) -> (WorkoutTimeline, Sender<TelemetryEvent>) {
    let (telemetry_tx, telemetry_rx) = unbounded();
    let engine = WorkoutTimeline::new(
        Arc::new(NullTrainer {
            last: Mutex::new(0),
        }),
        TelemetryCell::new(telemetry_rx),
        Box::new(TcxFileSink::new(export_dir)),
        200,
    );
    (engine, telemetry_tx)
}

#[test]
fn test_completed_ride_lands_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, telemetry_tx) = session_with_sink(dir.path().to_path_buf());

    let workout = Workout::new(
        "Openers".to_string(),
        vec![
            Interval::new(20, 120, IntervalKind::Warmup),
            Interval::new(20, 220, IntervalKind::Active),
        ],
    );
    engine.start_workout(workout, 1_750_000_000_000).unwrap();

    telemetry_tx.send(TelemetryEvent::Power(170)).unwrap();
    telemetry_tx.send(TelemetryEvent::HeartRate(150)).unwrap();
    telemetry_tx.send(TelemetryEvent::Cadence(95)).unwrap();
    for i in 0..40i64 {
        engine.tick(1_750_000_000_000 + (i + 1) * 1000);
    }

    assert!(!engine.is_active());

    let exports: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(exports.len(), 1);
    let name = exports[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("Veloce_"));
    assert!(name.ends_with(".tcx"));

    // The exported activity re-imports with every recorded second intact.
    let content = std::fs::read_to_string(&exports[0]).unwrap();
    let points = parse_tcx(&content).unwrap();
    assert_eq!(points.len(), 40);
    assert!(points.iter().all(|p| p.power == 170));
    assert!(points.iter().all(|p| p.heart_rate == 150));
}

#[test]
fn test_abandoned_ride_without_data_exports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, _telemetry_tx) = session_with_sink(dir.path().to_path_buf());

    let workout = Workout::new(
        "Never Started".to_string(),
        vec![Interval::new(60, 150, IntervalKind::Active)],
    );
    engine.start_workout(workout, 0).unwrap();
    // Rider never pedals; stop before any sample is recorded.
    engine.tick(1000);
    engine.stop_workout(2000);

    assert!(!engine.is_active());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_back_to_back_rides_export_separately() {
    let dir = tempfile::tempdir().unwrap();
    let (mut engine, telemetry_tx) = session_with_sink(dir.path().to_path_buf());

    telemetry_tx.send(TelemetryEvent::Power(160)).unwrap();

    // Two short rides started an hour apart; distinct start times mean
    // distinct export filenames.
    for start_ms in [1_750_000_000_000i64, 1_750_003_600_000] {
        let workout = Workout::new(
            "Quick Spin".to_string(),
            vec![Interval::new(5, 140, IntervalKind::Active)],
        );
        engine.start_workout(workout, start_ms).unwrap();
        for i in 0..5i64 {
            engine.tick(start_ms + (i + 1) * 1000);
        }
        assert!(!engine.is_active());
    }

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
