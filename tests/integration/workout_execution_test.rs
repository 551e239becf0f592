//! Integration tests for workout execution.
//!
//! Drives the timeline engine through complete sessions with mocked trainer
//! and sink collaborators: pedal-to-start gating, interval transitions,
//! pause/resume/skip and end-of-ride recording.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crossbeam::channel::{unbounded, Sender};
use veloce::recording::types::RecordingError;
use veloce::workout::parser_zwo::parse_zwo;
use veloce::{
    Interval, IntervalKind, RideRecord, RideSink, TelemetryCell, TelemetryEvent, TrainerControl,
    Workout, WorkoutTimeline,
};

struct RecordingTrainer {
    commands: Mutex<Vec<i16>>,
}

impl RecordingTrainer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            commands: Mutex::new(Vec::new()),
        })
    }

    fn commands(&self) -> Vec<i16> {
        self.commands.lock().unwrap().clone()
    }
}

impl TrainerControl for RecordingTrainer {
    fn set_target_power(&self, watts: i16) {
        self.commands.lock().unwrap().push(watts);
    }
}

struct CapturingSink {
    rides: Arc<Mutex<Vec<RideRecord>>>,
}

impl RideSink for CapturingSink {
    fn save(&self, record: &RideRecord) -> Result<(), RecordingError> {
        self.rides.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn export(&self, _record: &RideRecord) -> Result<PathBuf, RecordingError> {
        Ok(PathBuf::from("/tmp/ride.tcx"))
    }
}

struct Session {
    engine: WorkoutTimeline,
    trainer: Arc<RecordingTrainer>,
    telemetry_tx: Sender<TelemetryEvent>,
    rides: Arc<Mutex<Vec<RideRecord>>>,
    clock_ms: i64,
}

impl Session {
    fn new(ftp: u16) -> Self {
        let trainer = RecordingTrainer::new();
        let (telemetry_tx, telemetry_rx) = unbounded();
        let rides = Arc::new(Mutex::new(Vec::new()));
        let sink = Box::new(CapturingSink {
            rides: rides.clone(),
        });

        Self {
            engine: WorkoutTimeline::new(
                trainer.clone(),
                TelemetryCell::new(telemetry_rx),
                sink,
                ftp,
            ),
            trainer,
            telemetry_tx,
            rides,
            clock_ms: 0,
        }
    }

    fn pedal(&self, power: i16) {
        self.telemetry_tx.send(TelemetryEvent::Power(power)).unwrap();
        self.telemetry_tx
            .send(TelemetryEvent::HeartRate(145))
            .unwrap();
        self.telemetry_tx.send(TelemetryEvent::Cadence(90)).unwrap();
    }

    fn tick_secs(&mut self, secs: u32) {
        for _ in 0..secs {
            self.clock_ms += 1000;
            self.engine.tick(self.clock_ms);
        }
    }
}

fn pyramid_workout() -> Workout {
    Workout::new(
        "Pyramid".to_string(),
        vec![
            Interval::new(60, 110, IntervalKind::Warmup),
            Interval::new(120, 200, IntervalKind::Active),
            Interval::new(60, 120, IntervalKind::Recovery),
            Interval::new(60, 100, IntervalKind::Cooldown),
        ],
    )
}

#[test]
fn test_workout_waits_for_pedaling_then_runs_to_completion() {
    let mut s = Session::new(200);
    s.engine.start_workout(pyramid_workout(), 0).unwrap();

    // Trainer is loaded with the first target immediately.
    assert_eq!(s.trainer.commands(), vec![110]);

    // No pedaling: the clock must not move.
    s.tick_secs(10);
    assert_eq!(s.engine.state().unwrap().elapsed_secs, 0);

    // Ride the full 5 minutes.
    s.pedal(150);
    s.tick_secs(300);

    assert!(!s.engine.is_active());
    let rides = s.rides.lock().unwrap();
    assert_eq!(rides.len(), 1);
    assert_eq!(rides[0].points.len(), 300);
    assert_eq!(rides[0].summary.duration_secs, 300);
    // Each interval boundary re-targets the trainer; stop loads the fallback.
    assert_eq!(s.trainer.commands(), vec![110, 200, 120, 100, 100]);
}

#[test]
fn test_pause_freezes_clock_and_recording() {
    let mut s = Session::new(200);
    s.engine.start_workout(pyramid_workout(), 0).unwrap();
    s.pedal(150);
    s.tick_secs(30);

    s.engine.pause_workout().unwrap();
    s.tick_secs(45);
    {
        let state = s.engine.state().unwrap();
        assert_eq!(state.elapsed_secs, 30);
        assert_eq!(state.points.len(), 30);
    }

    s.engine.resume_workout().unwrap();
    s.tick_secs(10);
    assert_eq!(s.engine.state().unwrap().elapsed_secs, 40);
}

#[test]
fn test_skip_walks_forward_and_final_skip_ends_ride() {
    let mut s = Session::new(200);
    s.engine.start_workout(pyramid_workout(), 0).unwrap();
    s.pedal(150);
    s.tick_secs(15);

    s.engine.skip_interval(s.clock_ms).unwrap();
    s.engine.skip_interval(s.clock_ms).unwrap();
    {
        let state = s.engine.state().unwrap();
        assert_eq!(state.active_index, 2);
        // Skipping leaves the overall clock alone.
        assert_eq!(state.elapsed_secs, 15);
    }

    s.engine.skip_interval(s.clock_ms).unwrap();
    s.engine.skip_interval(s.clock_ms).unwrap();

    assert!(!s.engine.is_active());
    assert_eq!(s.rides.lock().unwrap().len(), 1);
    assert_eq!(s.trainer.commands(), vec![110, 200, 120, 100, 100]);
}

#[test]
fn test_imported_zwo_rides_end_to_end() {
    let zwo = r#"<workout_file>
        <name>Short Stack</name>
        <workout>
            <SteadyState Duration="20" Power="0.6"/>
            <IntervalsT Repeat="2" OnDuration="15" OffDuration="15" OnPower="1.2" OffPower="0.5"/>
        </workout>
    </workout_file>"#;
    let workout = parse_zwo(zwo, 250).unwrap();

    let mut s = Session::new(250);
    s.engine.start_workout(workout, 0).unwrap();
    s.pedal(180);
    s.tick_secs(80);

    assert!(!s.engine.is_active());
    // 150W steady, then 2x(300W on / 125W off), then the stop fallback.
    assert_eq!(s.trainer.commands(), vec![150, 300, 125, 300, 125, 100]);
    assert_eq!(s.rides.lock().unwrap()[0].points.len(), 80);
}

#[test]
fn test_telemetry_holds_last_value_between_notifications() {
    let mut s = Session::new(200);
    s.engine.start_workout(pyramid_workout(), 0).unwrap();

    // A single notification burst; the cell latches it for later ticks.
    s.pedal(160);
    s.tick_secs(5);

    let state = s.engine.state().unwrap();
    assert_eq!(state.points.len(), 5);
    assert!(state.points.iter().all(|p| p.power == 160));
    assert!(state.points.iter().all(|p| p.heart_rate == 145));
}
