//! Device session types: connection slots, telemetry events, the
//! latest-value telemetry cell and the trainer control seam.

use crossbeam::channel::Receiver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A decoded telemetry update from a connected device or the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// Instantaneous power in watts
    Power(i16),
    /// Heart rate in BPM
    HeartRate(u16),
    /// Cadence in RPM
    Cadence(u16),
    /// All sources went away; clear every field
    Reset,
}

/// Latest known value per telemetry field.
///
/// Each notification overwrites its own field; consumers sample whatever is
/// current at read time rather than queueing per-notification history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Telemetry {
    /// Instantaneous power in watts
    pub power: Option<i16>,
    /// Heart rate in BPM
    pub heart_rate: Option<u16>,
    /// Cadence in RPM
    pub cadence: Option<u16>,
}

/// Single-reader cell that folds a stream of [`TelemetryEvent`]s into the
/// latest [`Telemetry`] snapshot.
///
/// Notification tasks push into the channel at device rate; the workout
/// engine drains it once per tick and reads the result.
pub struct TelemetryCell {
    rx: Receiver<TelemetryEvent>,
    latest: Telemetry,
}

impl TelemetryCell {
    pub fn new(rx: Receiver<TelemetryEvent>) -> Self {
        Self {
            rx,
            latest: Telemetry::default(),
        }
    }

    /// Drain all queued events and return the resulting snapshot.
    pub fn sample(&mut self) -> Telemetry {
        while let Ok(event) = self.rx.try_recv() {
            match event {
                TelemetryEvent::Power(w) => self.latest.power = Some(w),
                TelemetryEvent::HeartRate(bpm) => self.latest.heart_rate = Some(bpm),
                TelemetryEvent::Cadence(rpm) => self.latest.cadence = Some(rpm),
                TelemetryEvent::Reset => self.latest = Telemetry::default(),
            }
        }
        self.latest
    }
}

/// Sink for ERG-mode target power commands.
///
/// The workout engine calls this synchronously from its tick path; real
/// implementations queue the BLE write and never block or fail the caller.
pub trait TrainerControl: Send + Sync {
    fn set_target_power(&self, watts: i16);
}

/// Which connection slot a peripheral occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Smart trainer or power meter
    Bike,
    /// Heart rate monitor
    HeartRate,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Bike => write!(f, "Bike"),
            DeviceKind::HeartRate => write!(f, "Heart Rate"),
        }
    }
}

/// Connection state of one device slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionSlot {
    /// Whether a peripheral (or the simulator) currently occupies the slot
    pub connected: bool,
    /// Advertised name of the occupant
    pub name: Option<String>,
}

impl ConnectionSlot {
    pub fn occupy(&mut self, name: String) {
        self.connected = true;
        self.name = Some(name);
    }

    pub fn clear(&mut self) {
        self.connected = false;
        self.name = None;
    }
}

/// Errors from the device session layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// BLE adapter not found or unavailable
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// Failed to start BLE scanning
    #[error("Failed to start scanning: {0}")]
    ScanFailed(String),

    /// No matching peripheral found before the scan timed out
    #[error("No {0} device found")]
    DeviceNotFound(DeviceKind),

    /// Connection to peripheral failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Peripheral lacks every service the slot requires
    #[error("Required service not found on {0}")]
    ServiceNotFound(String),

    /// Failed to subscribe to notifications
    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    /// Generic BLE error
    #[error("BLE error: {0}")]
    BleError(String),
}
