//! BLE device session management: trainer and heart-rate connection slots,
//! notification streaming, ERG control writes and the simulated ride source.

pub mod manager;
pub mod simulation;
pub mod types;

pub use manager::DeviceSessionManager;
pub use types::{
    ConnectionSlot, DeviceError, Telemetry, TelemetryCell, TelemetryEvent, TrainerControl,
};
