//! Decoding of BLE GATT characteristic payloads into semantic telemetry.

pub mod gatt;
