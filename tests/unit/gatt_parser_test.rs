//! Unit tests for GATT telemetry decoding.

use veloce::telemetry::gatt::{
    build_request_control, build_set_target_power, build_start_or_resume, parse_control_response,
    parse_cycling_power, parse_heart_rate, parse_indoor_bike_data, ControlResult,
};

#[test]
fn test_parse_heart_rate_u8_format() {
    // Flags: 0x00 (8-bit HR)
    // HR: 145 BPM
    let data = [0x00, 0x91];
    let result = parse_heart_rate(&data).unwrap();

    assert_eq!(result.heart_rate_bpm, 145);
    assert!(!result.sensor_contact);
    assert!(result.rr_intervals.is_empty());
}

#[test]
fn test_parse_heart_rate_u16_format() {
    // Flags: 0x01 (16-bit HR)
    // HR: 180 BPM
    let data = [0x01, 0xB4, 0x00];
    let result = parse_heart_rate(&data).unwrap();

    assert_eq!(result.heart_rate_bpm, 180);
}

#[test]
fn test_parse_heart_rate_sensor_contact() {
    // Flags: 0x06 (contact supported + detected)
    let detected = parse_heart_rate(&[0x06, 0x78]).unwrap();
    assert_eq!(detected.heart_rate_bpm, 120);
    assert!(detected.sensor_contact);

    // Flags: 0x04 (contact supported, not detected)
    let lost = parse_heart_rate(&[0x04, 0x64]).unwrap();
    assert_eq!(lost.heart_rate_bpm, 100);
    assert!(!lost.sensor_contact);
}

#[test]
fn test_parse_heart_rate_rr_intervals_after_energy() {
    // Flags: 0x18 (energy expended + RR intervals)
    // HR: 150, energy skipped, RR: 700 and 710 (1/1024s units)
    let data = [0x18, 0x96, 0x34, 0x12, 0xBC, 0x02, 0xC6, 0x02];
    let result = parse_heart_rate(&data).unwrap();

    assert_eq!(result.heart_rate_bpm, 150);
    assert_eq!(result.rr_intervals, vec![700, 710]);
}

#[test]
fn test_parse_heart_rate_empty_payload() {
    assert!(parse_heart_rate(&[]).is_none());
}

#[test]
fn test_parse_cycling_power_basic() {
    // Flags: 0x0000, power: 200W
    let data = [0x00, 0x00, 0xC8, 0x00];
    let result = parse_cycling_power(&data).unwrap();

    assert_eq!(result.power_watts, 200);
    assert!(result.pedal_balance.is_none());
    assert!(result.crank_revolutions.is_none());
}

#[test]
fn test_parse_cycling_power_negative() {
    // Flags: 0x0000, power: -50W (braking / calibration artifact)
    let data = [0x00, 0x00, 0xCE, 0xFF];
    let result = parse_cycling_power(&data).unwrap();

    assert_eq!(result.power_watts, -50);
}

#[test]
fn test_parse_cycling_power_wheel_block_offsets_crank() {
    // Flags: 0x0030 (wheel + crank revolution data)
    // Power: 250W, wheel: 5000 revs @ t=2048, crank: 1200 revs @ t=1024
    let data = [
        0x30, 0x00, 0xFA, 0x00, // flags + power
        0x88, 0x13, 0x00, 0x00, 0x00, 0x08, // wheel: u32 revs + u16 time
        0xB0, 0x04, 0x00, 0x04, // crank: u16 revs + u16 time
    ];
    let result = parse_cycling_power(&data).unwrap();

    assert_eq!(result.power_watts, 250);
    assert_eq!(result.wheel_revolutions, Some(5000));
    assert_eq!(result.crank_revolutions, Some(1200));
    assert_eq!(result.last_crank_event_time, Some(1024));
}

#[test]
fn test_parse_cycling_power_truncated_optional_field() {
    // Flags claim crank data but the payload ends early; the sample is
    // dropped rather than misread.
    let data = [0x20, 0x00, 0xFA, 0x00, 0xB0];
    assert!(parse_cycling_power(&data).is_none());
}

#[test]
fn test_parse_cycling_power_too_short() {
    assert!(parse_cycling_power(&[0x00, 0x00, 0xC8]).is_none());
}

#[test]
fn test_parse_indoor_bike_data_speed_only() {
    // Flags: 0x0000 (instantaneous speed only)
    let data = [0x00, 0x00, 0xC4, 0x09];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert!(result.cadence_rpm.is_none());
    assert!(result.power_watts.is_none());
}

#[test]
fn test_parse_indoor_bike_data_with_power() {
    // Flags: 0x0040 (speed + instantaneous power)
    // Speed: 3000, power: 250W
    let data = [0x40, 0x00, 0xB8, 0x0B, 0xFA, 0x00];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert_eq!(result.power_watts, Some(250));
}

#[test]
fn test_parse_indoor_bike_data_cadence_resolution() {
    // Flags: 0x0044 (speed + cadence + power)
    // Cadence raw 181 = 90.5 RPM, rounds to 91
    let data = [0x44, 0x00, 0xD0, 0x07, 0xB5, 0x00, 0x2C, 0x01];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert_eq!(result.cadence_rpm, Some(91));
    assert_eq!(result.power_watts, Some(300));
}

#[test]
fn test_parse_indoor_bike_data_more_data_flag_skips_speed() {
    // Flags: 0x0041 (More Data set, so no speed field; power follows)
    let data = [0x41, 0x00, 0xFA, 0x00];
    let result = parse_indoor_bike_data(&data).unwrap();

    assert_eq!(result.power_watts, Some(250));
}

#[test]
fn test_parse_indoor_bike_data_too_short() {
    assert!(parse_indoor_bike_data(&[0x44]).is_none());
}

#[test]
fn test_parse_control_response_success() {
    // [response marker, SetTargetPower, success]
    let result = parse_control_response(&[0x80, 0x05, 0x01]).unwrap();
    assert_eq!(result.request_opcode, 0x05);
    assert_eq!(result.result, ControlResult::Success);
}

#[test]
fn test_parse_control_response_not_permitted() {
    let result = parse_control_response(&[0x80, 0x00, 0x05]).unwrap();
    assert_eq!(result.result, ControlResult::ControlNotPermitted);
}

#[test]
fn test_parse_control_response_non_response_payload() {
    assert!(parse_control_response(&[0x05, 0xFA, 0x00]).is_none());
}

#[test]
fn test_build_request_control() {
    assert_eq!(build_request_control(), vec![0x00]);
}

#[test]
fn test_build_start_or_resume() {
    assert_eq!(build_start_or_resume(), vec![0x07]);
}

#[test]
fn test_build_set_target_power() {
    assert_eq!(build_set_target_power(250), vec![0x05, 0xFA, 0x00]);
    assert_eq!(build_set_target_power(500), vec![0x05, 0xF4, 0x01]);
}
