//! Collaborator boundary: where samples and geofences come from.
//!
//! The engine never talks to a database itself. A host implements
//! [`PositionSource`] and [`GeofenceSource`] over whatever transport it uses and
//! hands them to the report builders. Contracts the engine relies on:
//!
//! - Position samples for one vehicle arrive in ascending time order, restricted
//!   to the inclusive report period ([`DateRange::start_of_period`] to
//!   [`DateRange::end_of_period`]). An empty vector means "no data", not failure.
//! - `distance` on each sample is non-negative and covers the interval ending at
//!   that sample's time.
//! - Geofence records are returned in catalog order. **Order is significant**:
//!   when a point lies inside several geofences, the earliest one wins.
//! - Failures to reach the backing store are reported as
//!   [`ReportError::DataUnavailable`].

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::classify::PositionSample;
use crate::error::{ReportError, Result};

// ============================================================================
// Identity & Period
// ============================================================================

/// A tracked vehicle (one GPS device).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Vehicle {
    /// Device identifier in the source system
    pub id: String,
    /// Display name
    pub name: String,
    pub imei: Option<String>,
    /// Device group title (e.g. "Bus", "Heavy", "Light")
    pub group: Option<String>,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            imei: None,
            group: None,
        }
    }

    pub fn with_imei(mut self, imei: impl Into<String>) -> Self {
        self.imei = Some(imei.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Report period, inclusive of both the start and the end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a period; `end` must not precede `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ReportError::integrity(
                "report period",
                format!("end date {} is before start date {}", end, start),
            ));
        }
        Ok(Self { start, end })
    }

    /// A single-day period.
    pub fn day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    /// First second of the period (start date, 00:00:00).
    pub fn start_of_period(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Last second of the period (end date, 23:59:59).
    pub fn end_of_period(&self) -> NaiveDateTime {
        self.end.and_time(NaiveTime::MIN) + Duration::seconds(86_399)
    }

    pub fn contains(&self, time: &NaiveDateTime) -> bool {
        *time >= self.start_of_period() && *time <= self.end_of_period()
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// Supplies the time-ordered position samples of one vehicle for a period.
pub trait PositionSource: Send + Sync {
    fn positions(&self, vehicle: &Vehicle, range: &DateRange) -> Result<Vec<PositionSample>>;
}

/// Supplies a user's geofence records in catalog order.
pub trait GeofenceSource: Send + Sync {
    fn geofences(&self, user_id: u64) -> Result<Vec<GeofenceRecord>>;
}

/// A geofence row as stored by the tracking platform.
///
/// `kind` is `"polygon"` or `"circle"`. Polygons carry `coordinates`, a JSON
/// array of `{"lat": .., "lng": ..}` objects; circles carry `center` (one such
/// object) and `radius` in meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Option<String>,
    #[serde(default)]
    pub center: Option<String>,
    #[serde(default)]
    pub radius: Option<f64>,
}

impl GeofenceRecord {
    pub fn polygon(name: impl Into<String>, coordinates: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: "polygon".to_string(),
            coordinates: Some(coordinates.into()),
            center: None,
            radius: None,
        }
    }

    pub fn circle(name: impl Into<String>, center: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            kind: "circle".to_string(),
            coordinates: None,
            center: Some(center.into()),
            radius: Some(radius),
        }
    }
}

// ============================================================================
// Sensor Payload
// ============================================================================

/// Decode the ignition signal from a device sensor payload.
///
/// Devices report telemetry as an XML-like blob, e.g.
/// `<info><sat>11</sat><ignition>true</ignition><power>12.4</power></info>`.
/// `true`, `1` and `on` (any case) mean the engine is running; any other value,
/// or a missing tag, means it is off.
///
/// # Example
/// ```
/// use trip_report::ignition_from_payload;
///
/// assert!(ignition_from_payload("<info><ignition>true</ignition></info>"));
/// assert!(!ignition_from_payload("<info><ignition>0</ignition></info>"));
/// assert!(!ignition_from_payload("<info><sat>9</sat></info>"));
/// ```
pub fn ignition_from_payload(payload: &str) -> bool {
    const OPEN: &str = "<ignition>";
    const CLOSE: &str = "</ignition>";

    let Some(start) = payload.find(OPEN).map(|i| i + OPEN.len()) else {
        return false;
    };
    let Some(len) = payload[start..].find(CLOSE) else {
        return false;
    };

    let value = payload[start..start + len].trim();
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("on")
}

// ============================================================================
// In-Memory Feed
// ============================================================================

/// Position and geofence feed backed by in-memory maps.
///
/// Applies the same period filter a database-backed feed would, which makes it
/// suitable for tests, demos and replaying exported data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeed {
    positions: HashMap<String, Vec<PositionSample>>,
    geofences: HashMap<u64, Vec<GeofenceRecord>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register samples for a vehicle id (kept in the given order).
    pub fn with_positions(
        mut self,
        vehicle_id: impl Into<String>,
        samples: Vec<PositionSample>,
    ) -> Self {
        self.positions.insert(vehicle_id.into(), samples);
        self
    }

    pub fn with_geofences(mut self, user_id: u64, records: Vec<GeofenceRecord>) -> Self {
        self.geofences.insert(user_id, records);
        self
    }
}

impl PositionSource for InMemoryFeed {
    fn positions(&self, vehicle: &Vehicle, range: &DateRange) -> Result<Vec<PositionSample>> {
        Ok(self
            .positions
            .get(&vehicle.id)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| range.contains(&s.time))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl GeofenceSource for InMemoryFeed {
    fn geofences(&self, user_id: u64) -> Result<Vec<GeofenceRecord>> {
        Ok(self.geofences.get(&user_id).cloned().unwrap_or_default())
    }
}
