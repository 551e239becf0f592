//! GATT characteristic parsing for heart-rate, cycling-power and FTMS
//! peripherals, plus FTMS Control Point command builders.
//!
//! All parse functions are pure and defensive: flag bits declared by the
//! peripheral drive the byte-offset walk, and every read is bounds-checked so
//! a short or desynced payload yields `None` (sample dropped) instead of a
//! panic crossing the notification boundary.

use uuid::Uuid;

/// Heart Rate Service UUID (0x180D)
pub const HEART_RATE_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_180d_0000_1000_8000_0080_5f9b_34fb);

/// Heart Rate Measurement UUID (0x2A37)
pub const HEART_RATE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a37_0000_1000_8000_0080_5f9b_34fb);

/// Cycling Power Service UUID (0x1818)
pub const CYCLING_POWER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1818_0000_1000_8000_0080_5f9b_34fb);

/// Cycling Power Measurement UUID (0x2A63)
pub const CYCLING_POWER_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a63_0000_1000_8000_0080_5f9b_34fb);

/// Fitness Machine Service UUID (0x1826)
pub const FTMS_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1826_0000_1000_8000_0080_5f9b_34fb);

/// Indoor Bike Data Characteristic UUID (0x2AD2)
pub const INDOOR_BIKE_DATA_UUID: Uuid =
    Uuid::from_u128(0x0000_2ad2_0000_1000_8000_0080_5f9b_34fb);

/// Fitness Machine Control Point UUID (0x2AD9)
pub const FTMS_CONTROL_POINT_UUID: Uuid =
    Uuid::from_u128(0x0000_2ad9_0000_1000_8000_0080_5f9b_34fb);

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_i16_le(data: &[u8], offset: usize) -> Option<i16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(i16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Parsed Heart Rate Measurement (0x2A37) notification.
#[derive(Debug, Clone, Default)]
pub struct HeartRateMeasurement {
    /// Heart rate in BPM
    pub heart_rate_bpm: u16,
    /// Sensor contact detected
    pub sensor_contact: bool,
    /// RR intervals in 1/1024 s units (if present)
    pub rr_intervals: Vec<u16>,
}

/// Parse a Heart Rate Measurement notification.
///
/// Byte 0 is a flag field; bit 0 selects an 8-bit value at byte 1 versus a
/// 16-bit little-endian value at bytes 1-2.
pub fn parse_heart_rate(data: &[u8]) -> Option<HeartRateMeasurement> {
    let flags = *data.first()?;
    let hr_format_u16 = (flags & 0x01) != 0;
    let contact_supported = (flags & 0x04) != 0;
    let energy_present = (flags & 0x08) != 0;
    let rr_present = (flags & 0x10) != 0;

    let mut offset = 1usize;
    let heart_rate_bpm = if hr_format_u16 {
        let hr = read_u16_le(data, offset)?;
        offset += 2;
        hr
    } else {
        let hr = *data.get(offset)? as u16;
        offset += 1;
        hr
    };

    let mut result = HeartRateMeasurement {
        heart_rate_bpm,
        sensor_contact: contact_supported && (flags & 0x02) != 0,
        rr_intervals: Vec::new(),
    };

    // Energy expended is skipped for offset alignment only.
    if energy_present {
        offset += 2;
    }

    if rr_present {
        while let Some(rr) = read_u16_le(data, offset) {
            result.rr_intervals.push(rr);
            offset += 2;
        }
    }

    Some(result)
}

/// Parsed Cycling Power Measurement (0x2A63) notification.
#[derive(Debug, Clone, Default)]
pub struct CyclingPowerMeasurement {
    /// Instantaneous power in watts (always present, signed)
    pub power_watts: i16,
    /// Pedal power balance (if present)
    pub pedal_balance: Option<u8>,
    /// Accumulated torque (if present)
    pub accumulated_torque: Option<u16>,
    /// Cumulative wheel revolutions (if present)
    pub wheel_revolutions: Option<u32>,
    /// Cumulative crank revolutions (if present)
    pub crank_revolutions: Option<u16>,
    /// Last crank event time in 1/1024 s units (if present)
    pub last_crank_event_time: Option<u16>,
}

/// Parse a Cycling Power Measurement notification.
///
/// Bytes 0-1 are a little-endian flag field, bytes 2-3 the instantaneous
/// power (sint16, always present). Optional fields follow in declared order
/// and must be consumed per flag bit to keep subsequent offsets aligned:
/// pedal balance (1 byte, bit 0), accumulated torque (2 bytes, bit 2), wheel
/// revolution data (6 bytes, bit 4), crank revolution data (4 bytes, bit 5).
/// Peripherals vary in which subsets they report.
pub fn parse_cycling_power(data: &[u8]) -> Option<CyclingPowerMeasurement> {
    let flags = read_u16_le(data, 0)?;
    let power_watts = read_i16_le(data, 2)?;

    let mut result = CyclingPowerMeasurement {
        power_watts,
        ..Default::default()
    };
    let mut offset = 4usize;

    // Pedal Power Balance (bit 0)
    if (flags & 0x0001) != 0 {
        result.pedal_balance = data.get(offset).copied();
        result.pedal_balance?;
        offset += 1;
    }

    // Accumulated Torque (bit 2)
    if (flags & 0x0004) != 0 {
        result.accumulated_torque = read_u16_le(data, offset);
        result.accumulated_torque?;
        offset += 2;
    }

    // Wheel Revolution Data (bit 4): uint32 revolutions + uint16 event time
    if (flags & 0x0010) != 0 {
        let bytes = data.get(offset..offset + 4)?;
        result.wheel_revolutions = Some(u32::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3],
        ]));
        offset += 6;
    }

    // Crank Revolution Data (bit 5): uint16 revolutions + uint16 event time
    if (flags & 0x0020) != 0 {
        result.crank_revolutions = read_u16_le(data, offset);
        result.crank_revolutions?;
        result.last_crank_event_time = read_u16_le(data, offset + 2);
        result.last_crank_event_time?;
    }

    Some(result)
}

/// Parsed FTMS Indoor Bike Data (0x2AD2) notification.
///
/// Only cadence and instantaneous power are surfaced to the session layer;
/// the other fields are walked purely to keep offsets aligned.
#[derive(Debug, Clone, Default)]
pub struct IndoorBikeData {
    /// Instantaneous cadence in RPM (raw value has 0.5 RPM resolution)
    pub cadence_rpm: Option<u16>,
    /// Instantaneous power in watts (if present)
    pub power_watts: Option<i16>,
}

/// Parse an FTMS Indoor Bike Data notification.
pub fn parse_indoor_bike_data(data: &[u8]) -> Option<IndoorBikeData> {
    let flags = read_u16_le(data, 0)?;
    let mut result = IndoorBikeData::default();
    let mut offset = 2usize;

    // Instantaneous speed is present unless the More Data flag (bit 0) is set.
    if (flags & 0x0001) == 0 {
        read_u16_le(data, offset)?;
        offset += 2;
    }

    // Average speed (bit 1)
    if (flags & 0x0002) != 0 {
        read_u16_le(data, offset)?;
        offset += 2;
    }

    // Instantaneous cadence (bit 2), 0.5 RPM resolution
    if (flags & 0x0004) != 0 {
        let raw = read_u16_le(data, offset)?;
        result.cadence_rpm = Some((raw + 1) / 2);
        offset += 2;
    }

    // Average cadence (bit 3)
    if (flags & 0x0008) != 0 {
        read_u16_le(data, offset)?;
        offset += 2;
    }

    // Instantaneous power (bit 6)
    if (flags & 0x0040) != 0 {
        result.power_watts = Some(read_i16_le(data, offset)?);
        offset += 2;
    }

    // Average power (bit 7), consumed for alignment with any trailing fields
    if (flags & 0x0080) != 0 {
        read_u16_le(data, offset)?;
    }

    Some(result)
}

/// FTMS Control Point opcodes used by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlOpcode {
    /// Request control of the fitness machine
    RequestControl = 0x00,
    /// Set target power (ERG mode)
    SetTargetPower = 0x05,
    /// Start or resume training
    StartOrResume = 0x07,
    /// Response code marker
    ResponseCode = 0x80,
}

/// Result code carried in an FTMS Control Point response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlResult {
    Success,
    OpCodeNotSupported,
    InvalidParameter,
    OperationFailed,
    ControlNotPermitted,
    Unknown(u8),
}

impl From<u8> for ControlResult {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ControlResult::Success,
            0x02 => ControlResult::OpCodeNotSupported,
            0x03 => ControlResult::InvalidParameter,
            0x04 => ControlResult::OperationFailed,
            0x05 => ControlResult::ControlNotPermitted,
            other => ControlResult::Unknown(other),
        }
    }
}

/// Parsed FTMS Control Point indication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlResponse {
    /// Opcode of the request being acknowledged
    pub request_opcode: u8,
    /// Outcome reported by the machine
    pub result: ControlResult,
}

/// Parse an FTMS Control Point response indication.
///
/// Layout: `[0x80, request opcode, result code]`. Responses are used for
/// diagnostic logging only; they never gate further commands.
pub fn parse_control_response(data: &[u8]) -> Option<ControlResponse> {
    if *data.first()? != ControlOpcode::ResponseCode as u8 {
        return None;
    }
    Some(ControlResponse {
        request_opcode: *data.get(1)?,
        result: ControlResult::from(*data.get(2)?),
    })
}

/// Build a control point command to request control.
pub fn build_request_control() -> Vec<u8> {
    vec![ControlOpcode::RequestControl as u8]
}

/// Build a control point command to start or resume training.
pub fn build_start_or_resume() -> Vec<u8> {
    vec![ControlOpcode::StartOrResume as u8]
}

/// Build a control point command to set target power (ERG mode).
///
/// Payload is the opcode followed by the wattage as sint16 little-endian.
pub fn build_set_target_power(watts: i16) -> Vec<u8> {
    let mut cmd = vec![ControlOpcode::SetTargetPower as u8];
    cmd.extend_from_slice(&watts.to_le_bytes());
    cmd
}
