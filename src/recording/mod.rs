//! Ride recording: the per-second data point series, ride summaries, the
//! persistence/export seam and the TCX file exporter.

pub mod exporter_tcx;
pub mod types;

pub use types::{RecordingError, RideRecord, RideSink, RideSummary, WorkoutDataPoint};
