//! TCX activity import: extracts the per-second sample series from a ride
//! file so past activities can be re-analyzed with the metrics engine.

use chrono::DateTime;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::recording::types::WorkoutDataPoint;
use crate::workout::types::WorkoutParseError;

/// Parse trackpoints out of TCX content.
///
/// Only the fields the metrics engine consumes are read: time, heart rate,
/// cadence and watts. Trackpoints without a timestamp are skipped.
pub fn parse_tcx(content: &str) -> Result<Vec<WorkoutDataPoint>, WorkoutParseError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut points: Vec<WorkoutDataPoint> = Vec::new();

    let mut in_trackpoint = false;
    let mut in_heart_rate = false;
    let mut current_element: Option<String> = None;

    let mut timestamp_ms: Option<i64> = None;
    let mut heart_rate: u16 = 0;
    let mut cadence: u16 = 0;
    let mut power: i16 = 0;

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Trackpoint" => {
                        in_trackpoint = true;
                        timestamp_ms = None;
                        heart_rate = 0;
                        cadence = 0;
                        power = 0;
                    }
                    "HeartRateBpm" if in_trackpoint => {
                        in_heart_rate = true;
                    }
                    _ if in_trackpoint => {
                        current_element = Some(name);
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(e)) => {
                if !in_trackpoint {
                    continue;
                }
                let text = e.unescape().map_err(|e| {
                    WorkoutParseError::InvalidXml(format!("Failed to unescape text: {}", e))
                })?;

                match current_element.as_deref() {
                    Some("Time") => {
                        let parsed = DateTime::parse_from_rfc3339(&text).map_err(|_| {
                            WorkoutParseError::InvalidValue {
                                field: "Time".to_string(),
                                value: text.to_string(),
                            }
                        })?;
                        timestamp_ms = Some(parsed.timestamp_millis());
                    }
                    Some("Value") if in_heart_rate => {
                        heart_rate = text.parse().unwrap_or(0);
                    }
                    Some("Cadence") => {
                        cadence = text.parse().unwrap_or(0);
                    }
                    Some("Watts") | Some("ns3:Watts") => {
                        power = text.parse().unwrap_or(0);
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Trackpoint" => {
                        in_trackpoint = false;
                        if let Some(ts) = timestamp_ms {
                            points.push(WorkoutDataPoint {
                                timestamp_ms: ts,
                                power,
                                heart_rate,
                                cadence,
                            });
                        }
                    }
                    "HeartRateBpm" => {
                        in_heart_rate = false;
                    }
                    _ => {}
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

    Ok(points)
}

/// Parse a TCX file from disk.
pub fn parse_tcx_file(path: &std::path::Path) -> Result<Vec<WorkoutDataPoint>, WorkoutParseError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| WorkoutParseError::IoError(e.to_string()))?;
    parse_tcx(&content)
}
