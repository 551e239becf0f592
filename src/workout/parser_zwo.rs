//! Zwift workout (.zwo) file import.
//!
//! ZWO power attributes are fractions of FTP; the parser resolves them to
//! absolute watts at import time so the rest of the crate deals only in
//! ERG-ready intervals. Ranged blocks (Warmup, Cooldown, Ramp) become a
//! single interval at the range's average power.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::workout::types::{Interval, IntervalKind, Workout, WorkoutParseError};

/// Parse a ZWO workout from XML content, resolving power against `ftp`.
pub fn parse_zwo(content: &str, ftp: u16) -> Result<Workout, WorkoutParseError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut workout_name: Option<String> = None;
    let mut workout_description: Option<String> = None;
    let mut intervals: Vec<Interval> = Vec::new();

    let mut in_workout = false;
    let mut current_element: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();

                match name.as_str() {
                    "name" | "description" => {
                        current_element = Some(name);
                    }
                    "workout" => {
                        in_workout = true;
                    }
                    _ if in_workout => {
                        parse_block(&name, e, ftp, &mut intervals)?;
                    }
                    _ => {}
                }
            }
            Ok(Event::Empty(ref e)) => {
                if in_workout {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    parse_block(&name, e, ftp, &mut intervals)?;
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref elem) = current_element {
                    let text = e.unescape().map_err(|e| {
                        WorkoutParseError::InvalidXml(format!("Failed to unescape text: {}", e))
                    })?;
                    match elem.as_str() {
                        "name" => workout_name = Some(text.to_string()),
                        "description" => workout_description = Some(text.to_string()),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                if e.name().as_ref() == b"workout" {
                    in_workout = false;
                }
                current_element = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(WorkoutParseError::InvalidXml(format!(
                    "XML parsing error: {}",
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    if intervals.is_empty() {
        return Err(WorkoutParseError::EmptyWorkout);
    }

    let name = workout_name.unwrap_or_else(|| "Unnamed Workout".to_string());
    let mut workout = Workout::new(name, intervals);
    workout.description = workout_description;

    Ok(workout)
}

/// Parse a ZWO file from disk.
pub fn parse_zwo_file(path: &std::path::Path, ftp: u16) -> Result<Workout, WorkoutParseError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| WorkoutParseError::IoError(e.to_string()))?;
    parse_zwo(&content, ftp)
}

fn attr_value(
    event: &quick_xml::events::BytesStart<'_>,
    key: &str,
) -> Result<Option<f32>, WorkoutParseError> {
    for attr in event.attributes().flatten() {
        if attr.key.as_ref() == key.as_bytes() {
            let value = String::from_utf8_lossy(&attr.value);
            return value
                .parse()
                .map(Some)
                .map_err(|_| WorkoutParseError::InvalidValue {
                    field: key.to_string(),
                    value: value.to_string(),
                });
        }
    }
    Ok(None)
}

fn to_watts(fraction: f32, ftp: u16) -> u16 {
    (fraction * ftp as f32).round().max(0.0) as u16
}

/// Translate one workout block into intervals.
fn parse_block(
    element_name: &str,
    event: &quick_xml::events::BytesStart<'_>,
    ftp: u16,
    intervals: &mut Vec<Interval>,
) -> Result<(), WorkoutParseError> {
    match element_name {
        "Warmup" | "Cooldown" | "Ramp" => {
            let duration = attr_value(event, "Duration")?
                .ok_or_else(|| WorkoutParseError::MissingField("Duration".to_string()))?
                as u32;
            let low = attr_value(event, "PowerLow")?
                .ok_or_else(|| WorkoutParseError::MissingField("PowerLow".to_string()))?;
            let high = attr_value(event, "PowerHigh")?
                .ok_or_else(|| WorkoutParseError::MissingField("PowerHigh".to_string()))?;

            let kind = match element_name {
                "Warmup" => IntervalKind::Warmup,
                "Cooldown" => IntervalKind::Cooldown,
                _ => IntervalKind::Active,
            };

            let mut interval = Interval::new(duration, to_watts((low + high) / 2.0, ftp), kind);
            interval.cadence_target = attr_value(event, "Cadence")?.map(|c| c as u16);
            intervals.push(interval);
        }
        "SteadyState" => {
            let duration = attr_value(event, "Duration")?
                .ok_or_else(|| WorkoutParseError::MissingField("Duration".to_string()))?
                as u32;
            let power = attr_value(event, "Power")?
                .ok_or_else(|| WorkoutParseError::MissingField("Power".to_string()))?;

            let mut interval =
                Interval::new(duration, to_watts(power, ftp), IntervalKind::Active);
            interval.cadence_target = attr_value(event, "Cadence")?.map(|c| c as u16);
            intervals.push(interval);
        }
        "IntervalsT" => {
            let repeat = attr_value(event, "Repeat")?.unwrap_or(1.0) as u32;
            let on_duration = attr_value(event, "OnDuration")?.unwrap_or(0.0) as u32;
            let off_duration = attr_value(event, "OffDuration")?.unwrap_or(0.0) as u32;
            let on_power = attr_value(event, "OnPower")?.unwrap_or(1.0);
            let off_power = attr_value(event, "OffPower")?.unwrap_or(0.5);
            let on_cadence = attr_value(event, "Cadence")?.map(|c| c as u16);
            let off_cadence = attr_value(event, "CadenceResting")?.map(|c| c as u16);

            if on_duration == 0 && off_duration == 0 {
                return Err(WorkoutParseError::MissingField(
                    "OnDuration/OffDuration".to_string(),
                ));
            }

            for _ in 0..repeat {
                if on_duration > 0 {
                    let mut interval = Interval::new(
                        on_duration,
                        to_watts(on_power, ftp),
                        IntervalKind::Active,
                    );
                    interval.cadence_target = on_cadence;
                    intervals.push(interval);
                }
                if off_duration > 0 {
                    let mut interval = Interval::new(
                        off_duration,
                        to_watts(off_power, ftp),
                        IntervalKind::Recovery,
                    );
                    interval.cadence_target = off_cadence;
                    intervals.push(interval);
                }
            }
        }
        _ => {}
    }

    Ok(())
}
