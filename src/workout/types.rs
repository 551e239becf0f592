//! Workout model types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Role of an interval within the workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    /// Easy opening effort
    Warmup,
    /// Working effort
    Active,
    /// Easy spinning between efforts
    Recovery,
    /// Easy closing effort
    Cooldown,
}

impl std::fmt::Display for IntervalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalKind::Warmup => write!(f, "Warmup"),
            IntervalKind::Active => write!(f, "Active"),
            IntervalKind::Recovery => write!(f, "Recovery"),
            IntervalKind::Cooldown => write!(f, "Cooldown"),
        }
    }
}

/// A single ERG-mode interval: hold `target_power` for `duration_secs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Unique identifier
    pub id: Uuid,
    /// Duration in seconds
    pub duration_secs: u32,
    /// Target power in watts (absolute, already resolved against FTP)
    pub target_power: u16,
    /// Role of this interval
    pub kind: IntervalKind,
    /// Optional coaching text
    pub description: Option<String>,
    /// Optional cadence target in RPM
    pub cadence_target: Option<u16>,
}

impl Interval {
    pub fn new(duration_secs: u32, target_power: u16, kind: IntervalKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            duration_secs,
            target_power,
            kind,
            description: None,
            cadence_target: None,
        }
    }
}

/// A structured ERG workout: an ordered list of absolute-watt intervals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    /// Unique identifier
    pub id: Uuid,
    /// Workout name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Ordered list of intervals
    pub intervals: Vec<Interval>,
    /// Total workout duration in seconds (calculated)
    pub total_duration_secs: u32,
}

impl Workout {
    /// Create a new workout with the given name and intervals.
    pub fn new(name: String, intervals: Vec<Interval>) -> Self {
        let total_duration_secs = intervals.iter().map(|i| i.duration_secs).sum();

        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            intervals,
            total_duration_secs,
        }
    }

    /// Recompute the cached total duration after editing intervals.
    pub fn recompute_duration(&mut self) {
        self.total_duration_secs = self.intervals.iter().map(|i| i.duration_secs).sum();
    }
}

/// What a pending modification changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationKind {
    /// Watts delta applied to the current and all later intervals
    Power,
    /// Seconds delta applied to the current interval only
    Duration,
}

/// A suggested workout change awaiting rider approval.
///
/// At most one exists at a time; a newer suggestion replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingModification {
    /// What the delta applies to
    pub kind: ModificationKind,
    /// Signed delta (watts or seconds)
    pub value: i32,
    /// Human-readable rationale
    pub reason: String,
}

/// Errors related to workout execution.
#[derive(Debug, Error)]
pub enum WorkoutError {
    /// Workout has no intervals
    #[error("Workout has no intervals")]
    EmptyWorkout,

    /// Operation requires an active workout
    #[error("No active workout")]
    NoActiveWorkout,

    /// Operation requires a pending modification
    #[error("No pending modification")]
    NoPendingModification,

    /// Workout file could not be read
    #[error("Failed to read workout file: {0}")]
    FileReadError(String),

    /// Workout parsing failed
    #[error("Failed to parse workout: {0}")]
    ParseError(#[from] WorkoutParseError),
}

/// Errors during workout file parsing.
#[derive(Debug, Error)]
pub enum WorkoutParseError {
    /// Invalid XML structure
    #[error("Invalid XML: {0}")]
    InvalidXml(String),

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Invalid field value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Parsed workout has no intervals
    #[error("Workout has no intervals")]
    EmptyWorkout,

    /// IO error reading file
    #[error("IO error: {0}")]
    IoError(String),
}
