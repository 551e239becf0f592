//! Veloce - BLE smart-trainer protocol layer and ERG workout engine
//!
//! Connects FTMS/cycling-power trainers and heart-rate monitors over BLE,
//! decodes their telemetry, drives structured ERG workouts with pedal-to-start
//! and AI coaching hooks, computes training metrics, and records rides to TCX.

pub mod coach;
pub mod devices;
pub mod metrics;
pub mod recording;
pub mod storage;
pub mod telemetry;
pub mod workout;

// Re-export commonly used types
pub use devices::manager::DeviceSessionManager;
pub use devices::types::{Telemetry, TelemetryCell, TelemetryEvent, TrainerControl};
pub use metrics::zones::PowerZones;
pub use recording::types::{RideRecord, RideSink, RideSummary, WorkoutDataPoint};
pub use storage::config::UserProfile;
pub use workout::engine::WorkoutTimeline;
pub use workout::types::{Interval, IntervalKind, Workout};
