//! Workout model, timeline execution engine and workout file import.

pub mod engine;
pub mod parser_tcx;
pub mod parser_zwo;
pub mod types;

pub use engine::WorkoutTimeline;
pub use types::{Interval, IntervalKind, ModificationKind, PendingModification, Workout};
