//! Coggan power zones resolved against the rider's FTP.

use serde::{Deserialize, Serialize};

/// One power zone with its FTP percentages resolved to absolute watts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRange {
    /// Zone number, 1 through 7
    pub zone: u8,
    /// Common name
    pub name: String,
    /// Lower bound as a percentage of FTP
    pub min_percent: u16,
    /// Upper bound as a percentage of FTP
    pub max_percent: u16,
    /// Lower bound in watts
    pub min_watts: u16,
    /// Upper bound in watts
    pub max_watts: u16,
    /// What riding in this zone feels like
    pub description: String,
}

/// The seven-zone table as FTP percentages. The top zone is open-ended;
/// 1000% stands in for "no practical ceiling".
const ZONE_TABLE: [(u8, &str, u16, u16, &str); 7] = [
    (1, "Active Recovery", 0, 55, "Easy spinning, recovery"),
    (2, "Endurance", 56, 75, "All day pace, base building"),
    (3, "Tempo", 76, 90, "Rhythmic, aerobic pace"),
    (4, "Threshold", 91, 105, "Sustainable hard effort"),
    (5, "VO2 Max", 106, 120, "Very hard, short intervals"),
    (6, "Anaerobic", 121, 150, "Severe effort, very short"),
    (7, "Neuromuscular", 151, 1000, "Maximal sprinting"),
];

/// Power zones for one rider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerZones {
    zones: Vec<ZoneRange>,
}

impl PowerZones {
    /// Resolve the zone table against an FTP, rounding each bound to the
    /// nearest watt.
    pub fn from_ftp(ftp: u16) -> Self {
        let zones = ZONE_TABLE
            .iter()
            .map(|&(zone, name, min_percent, max_percent, description)| ZoneRange {
                zone,
                name: name.to_string(),
                min_percent,
                max_percent,
                min_watts: percent_of(ftp, min_percent),
                max_watts: percent_of(ftp, max_percent),
                description: description.to_string(),
            })
            .collect();

        Self { zones }
    }

    /// Zone number for a given power reading.
    pub fn zone_for(&self, watts: u16) -> u8 {
        self.zones
            .iter()
            .find(|z| watts <= z.max_watts)
            .map(|z| z.zone)
            .unwrap_or(7)
    }

    /// The range for one zone number, if it exists.
    pub fn range(&self, zone: u8) -> Option<&ZoneRange> {
        self.zones.iter().find(|z| z.zone == zone)
    }

    /// All seven ranges, in order.
    pub fn all(&self) -> &[ZoneRange] {
        &self.zones
    }
}

fn percent_of(ftp: u16, percent: u16) -> u16 {
    (f64::from(ftp) * f64::from(percent) / 100.0).round() as u16
}
