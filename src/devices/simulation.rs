//! Synthetic ride telemetry for development without hardware.
//!
//! A bounded random walk emits power, heart rate and cadence at 1 Hz through
//! the same event channel real peripherals use, so everything downstream of
//! the channel behaves identically in simulated rides.

use crate::devices::types::TelemetryEvent;
use crossbeam::channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::task::JoinHandle;

const POWER_RANGE: (i16, i16) = (50, 400);
const HEART_RATE_RANGE: (u16, u16) = (60, 190);
const CADENCE_RANGE: (u16, u16) = (40, 120);

/// Bounded random walk over the three telemetry fields.
///
/// Kept separate from the timer task so the walk itself is testable with a
/// seeded RNG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryWalk {
    pub power: i16,
    pub heart_rate: u16,
    pub cadence: u16,
}

impl Default for TelemetryWalk {
    fn default() -> Self {
        Self {
            power: 150,
            heart_rate: 120,
            cadence: 80,
        }
    }
}

impl TelemetryWalk {
    /// Advance every field by one bounded random step.
    pub fn step(&mut self, rng: &mut impl Rng) {
        self.power =
            (self.power + rng.gen_range(-5..=5)).clamp(POWER_RANGE.0, POWER_RANGE.1);
        self.heart_rate = (self.heart_rate as i32 + rng.gen_range(-2..=2))
            .clamp(HEART_RATE_RANGE.0 as i32, HEART_RATE_RANGE.1 as i32)
            as u16;
        self.cadence = (self.cadence as i32 + rng.gen_range(-3..=3))
            .clamp(CADENCE_RANGE.0 as i32, CADENCE_RANGE.1 as i32)
            as u16;
    }
}

/// Spawn the 1 Hz generator task.
///
/// The task runs until aborted or until the receiving side of the channel is
/// dropped.
pub fn spawn_generator(tx: Sender<TelemetryEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut rng = StdRng::from_entropy();
        let mut walk = TelemetryWalk::default();
        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        tracing::info!("Simulated telemetry generator started");

        loop {
            ticker.tick().await;
            walk.step(&mut rng);

            if tx.send(TelemetryEvent::Power(walk.power)).is_err()
                || tx.send(TelemetryEvent::HeartRate(walk.heart_rate)).is_err()
                || tx.send(TelemetryEvent::Cadence(walk.cadence)).is_err()
            {
                tracing::debug!("Telemetry channel closed, stopping generator");
                break;
            }
        }
    })
}
