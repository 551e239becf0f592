//! Ride recording types and the persistence/export seam.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// One recorded sample, appended once per running second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutDataPoint {
    /// Wall-clock timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: i64,
    /// Instantaneous power in watts (0 when no source was reporting)
    pub power: i16,
    /// Heart rate in BPM (0 when no source was reporting)
    pub heart_rate: u16,
    /// Cadence in RPM (0 when no source was reporting)
    pub cadence: u16,
}

/// Computed summary of a completed ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideSummary {
    /// Recorded duration in seconds
    pub duration_secs: u32,
    /// Total mechanical work in joules
    pub total_work_joules: u64,
    /// Average power in watts
    pub average_power: u16,
    /// Normalized power in watts
    pub normalized_power: u16,
    /// Intensity factor (NP / FTP, 2 decimal places)
    pub intensity_factor: f64,
    /// Training stress score (1 decimal place)
    pub training_stress_score: f64,
    /// Variability index (NP / average power, 2 decimal places)
    pub variability_index: f64,
}

/// A completed ride handed to the sink for persistence and export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRecord {
    /// Session identifier of the ride
    pub session: Uuid,
    /// Workout that was ridden
    pub workout_id: Uuid,
    /// Workout name, used for filenames and activity notes
    pub workout_name: String,
    /// When the workout was started
    pub started_at: DateTime<Utc>,
    /// When the workout ended
    pub finished_at: DateTime<Utc>,
    /// Per-second samples
    pub points: Vec<WorkoutDataPoint>,
    /// Computed metrics
    pub summary: RideSummary,
}

/// Errors from recording, persistence and export.
#[derive(Debug, Error)]
pub enum RecordingError {
    /// Ride has no recorded data
    #[error("No ride data recorded")]
    NoData,

    /// IO error writing a file
    #[error("IO error: {0}")]
    IoError(String),

    /// XML serialization failed
    #[error("XML error: {0}")]
    XmlError(String),

    /// Backend persistence failed
    #[error("Persistence error: {0}")]
    PersistenceError(String),
}

/// Destination for completed rides.
///
/// `save` and `export` are independent: the engine invokes both and a
/// failure of one never suppresses the other.
pub trait RideSink: Send {
    /// Persist the ride record.
    fn save(&self, record: &RideRecord) -> Result<(), RecordingError>;

    /// Export the ride to a file, returning the written path.
    fn export(&self, record: &RideRecord) -> Result<PathBuf, RecordingError>;
}
