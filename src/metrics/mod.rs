//! Training metrics: normalized power, intensity factor, training stress
//! score, variability index, total work and power zones.

pub mod calculator;
pub mod zones;

pub use calculator::{
    average_power, intensity_factor, normalized_power, summarize, total_work_joules,
    training_stress_score, variability_index,
};
pub use zones::{PowerZones, ZoneRange};
