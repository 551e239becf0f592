//! TCX export for completed rides, and the file-based ride sink.

use crate::recording::types::{RecordingError, RideRecord, RideSink, WorkoutDataPoint};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// TCX XML namespaces
const NS_TCX: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const NS_TPX: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";
const NS_XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2 http://www.garmin.com/xmlschemas/TrainingCenterDatabasev2.xsd";

/// Export a ride record to TCX format.
pub fn export_tcx(record: &RideRecord) -> Result<String, RecordingError> {
    if record.points.is_empty() {
        return Err(RecordingError::NoData);
    }

    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    let mut root = BytesStart::new("TrainingCenterDatabase");
    root.push_attribute(("xmlns", NS_TCX));
    root.push_attribute(("xmlns:ns3", NS_TPX));
    root.push_attribute(("xmlns:xsi", NS_XSI));
    root.push_attribute(("xsi:schemaLocation", SCHEMA_LOCATION));
    writer
        .write_event(Event::Start(root))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::Start(BytesStart::new("Activities")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    let mut activity = BytesStart::new("Activity");
    activity.push_attribute(("Sport", "Biking"));
    writer
        .write_event(Event::Start(activity))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    write_element(&mut writer, "Id", &record.started_at.to_rfc3339())?;

    write_lap(&mut writer, record)?;

    write_element(&mut writer, "Notes", &record.workout_name)?;

    writer
        .write_event(Event::End(BytesEnd::new("Activity")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("Activities")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("TrainingCenterDatabase")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    let result = writer.into_inner().into_inner();
    String::from_utf8(result).map_err(|e| RecordingError::XmlError(e.to_string()))
}

/// Write the single lap covering the whole ride.
fn write_lap<W: std::io::Write>(
    writer: &mut Writer<W>,
    record: &RideRecord,
) -> Result<(), RecordingError> {
    let mut lap = BytesStart::new("Lap");
    lap.push_attribute(("StartTime", record.started_at.to_rfc3339().as_str()));
    writer
        .write_event(Event::Start(lap))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    write_element(
        writer,
        "TotalTimeSeconds",
        &record.summary.duration_secs.to_string(),
    )?;

    // Joules to kilocalories.
    let calories = (record.summary.total_work_joules as f64 / 4184.0).round() as u64;
    write_element(writer, "Calories", &calories.to_string())?;

    let heart_rates: Vec<u16> = record
        .points
        .iter()
        .map(|p| p.heart_rate)
        .filter(|&hr| hr > 0)
        .collect();
    if !heart_rates.is_empty() {
        let avg = heart_rates.iter().map(|&h| h as u32).sum::<u32>() / heart_rates.len() as u32;
        let max = heart_rates.iter().copied().max().unwrap_or(0);
        write_heart_rate_element(writer, "AverageHeartRateBpm", avg as u16)?;
        write_heart_rate_element(writer, "MaximumHeartRateBpm", max)?;
    }

    write_element(writer, "Intensity", "Active")?;
    write_element(writer, "TriggerMethod", "Manual")?;

    write_track(writer, &record.points)?;

    write_lap_extensions(writer, record)?;

    writer
        .write_event(Event::End(BytesEnd::new("Lap")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

fn write_track<W: std::io::Write>(
    writer: &mut Writer<W>,
    points: &[WorkoutDataPoint],
) -> Result<(), RecordingError> {
    writer
        .write_event(Event::Start(BytesStart::new("Track")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    for point in points {
        write_trackpoint(writer, point)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("Track")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

fn write_trackpoint<W: std::io::Write>(
    writer: &mut Writer<W>,
    point: &WorkoutDataPoint,
) -> Result<(), RecordingError> {
    writer
        .write_event(Event::Start(BytesStart::new("Trackpoint")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    let time = DateTime::<Utc>::from_timestamp_millis(point.timestamp_ms)
        .unwrap_or_else(Utc::now);
    write_element(writer, "Time", &time.to_rfc3339())?;

    if point.heart_rate > 0 {
        write_heart_rate_element(writer, "HeartRateBpm", point.heart_rate)?;
    }

    if point.cadence > 0 {
        write_element(writer, "Cadence", &point.cadence.to_string())?;
    }

    // Power goes in the TPX extension, matching what most platforms import.
    writer
        .write_event(Event::Start(BytesStart::new("Extensions")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::Start(BytesStart::new("ns3:TPX")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    write_element(writer, "ns3:Watts", &point.power.max(0).to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new("ns3:TPX")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("Extensions")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    writer
        .write_event(Event::End(BytesEnd::new("Trackpoint")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

fn write_lap_extensions<W: std::io::Write>(
    writer: &mut Writer<W>,
    record: &RideRecord,
) -> Result<(), RecordingError> {
    let max_power = record
        .points
        .iter()
        .map(|p| p.power.max(0))
        .max()
        .unwrap_or(0);

    writer
        .write_event(Event::Start(BytesStart::new("Extensions")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::Start(BytesStart::new("ns3:LX")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    write_element(
        writer,
        "ns3:AvgWatts",
        &record.summary.average_power.to_string(),
    )?;
    write_element(writer, "ns3:MaxWatts", &max_power.to_string())?;

    writer
        .write_event(Event::End(BytesEnd::new("ns3:LX")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new("Extensions")))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

fn write_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<(), RecordingError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::Text(BytesText::new(value)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

/// Write a heart rate element with its Value sub-element.
fn write_heart_rate_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: u16,
) -> Result<(), RecordingError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;
    write_element(writer, "Value", &value.to_string())?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|e| RecordingError::XmlError(e.to_string()))?;

    Ok(())
}

/// Export a ride record to a TCX file.
pub fn export_tcx_to_file(record: &RideRecord, path: &Path) -> Result<(), RecordingError> {
    let content = export_tcx(record)?;
    std::fs::write(path, content).map_err(|e| RecordingError::IoError(e.to_string()))?;
    Ok(())
}

/// Generate a default filename for a ride export.
pub fn generate_tcx_filename(record: &RideRecord) -> String {
    let timestamp = record.started_at.format("%Y%m%d_%H%M%S");
    format!("Veloce_{}.tcx", timestamp)
}

/// Ride sink that writes a TCX file per ride into a fixed directory.
///
/// Persistence is a deployment concern; `save` here only acknowledges the
/// record so export still runs in setups with no backend configured.
pub struct TcxFileSink {
    export_dir: PathBuf,
}

impl TcxFileSink {
    pub fn new(export_dir: PathBuf) -> Self {
        Self { export_dir }
    }
}

impl RideSink for TcxFileSink {
    fn save(&self, record: &RideRecord) -> Result<(), RecordingError> {
        tracing::debug!(
            "No persistence backend configured, ride {} not saved",
            record.session
        );
        Ok(())
    }

    fn export(&self, record: &RideRecord) -> Result<PathBuf, RecordingError> {
        std::fs::create_dir_all(&self.export_dir)
            .map_err(|e| RecordingError::IoError(e.to_string()))?;

        let path = self.export_dir.join(generate_tcx_filename(record));
        export_tcx_to_file(record, &path)?;
        Ok(path)
    }
}
