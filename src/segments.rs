//! Trip segment construction.
//!
//! A single left-to-right pass over a vehicle's samples groups consecutive
//! samples that share a [`VehicleState`] into [`TripSegment`]s. Every sample
//! belongs to exactly one segment and segments come out in time order.
//!
//! Per-segment aggregates:
//! - `duration`: last sample time minus first sample time (0 for one sample).
//! - `distance`: sum of the samples' `distance` fields, **run segments only**.
//!   Idle and parked segments always report 0; movement while stopped is GPS jitter.
//! - `avg_speed`: distance over duration in hours for run segments, 0 otherwise.
//! - `location`: the first sample's coordinate, resolved against the geofence
//!   catalog once per segment.

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::{classify_samples, ClassifiedSample, PositionSample, VehicleState};
use crate::error::{ReportError, Result};
use crate::geofence::GeofenceCatalog;
use crate::{GpsPoint, ReportConfig};

/// Where a segment took place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentLocation {
    /// Name of the first matching geofence
    Geofence(String),
    /// Raw coordinate when no geofence matched
    Coordinates(GpsPoint),
}

impl SegmentLocation {
    pub fn geofence_name(&self) -> Option<&str> {
        match self {
            SegmentLocation::Geofence(name) => Some(name),
            SegmentLocation::Coordinates(_) => None,
        }
    }
}

impl fmt::Display for SegmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentLocation::Geofence(name) => f.write_str(name),
            SegmentLocation::Coordinates(p) => write!(f, "{:.6}, {:.6}", p.latitude, p.longitude),
        }
    }
}

/// A maximal run of consecutive samples sharing one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSegment {
    pub state: VehicleState,
    pub start_time: NaiveDateTime,
    pub stop_time: NaiveDateTime,
    /// Seconds between the first and last member sample
    pub duration: i64,
    /// Kilometres travelled (always 0 unless `state` is run)
    pub distance: f64,
    /// Average speed in km/h (0 unless run with non-zero duration)
    pub avg_speed: f64,
    /// Highest reported speed in km/h (0 unless run)
    pub max_speed: f64,
    pub location: SegmentLocation,
    /// Index of the first member sample in the vehicle's input
    pub first_sample: usize,
    pub sample_count: usize,
}

impl TripSegment {
    /// Index range of member samples in the vehicle's input.
    pub fn sample_range(&self) -> std::ops::Range<usize> {
        self.first_sample..self.first_sample + self.sample_count
    }
}

/// Running segment during the scan.
struct SegmentBuilder {
    state: VehicleState,
    first_sample: usize,
    sample_count: usize,
    start_time: NaiveDateTime,
    stop_time: NaiveDateTime,
    origin: GpsPoint,
    distance: f64,
    max_speed: f64,
}

impl SegmentBuilder {
    fn start(idx: usize, classified: &ClassifiedSample<'_>) -> Self {
        let mut builder = Self {
            state: classified.state,
            first_sample: idx,
            sample_count: 0,
            start_time: classified.sample.time,
            stop_time: classified.sample.time,
            origin: classified.sample.point(),
            distance: 0.0,
            max_speed: 0.0,
        };
        builder.extend(classified.sample);
        builder
    }

    fn extend(&mut self, sample: &PositionSample) {
        self.sample_count += 1;
        self.stop_time = sample.time;
        if self.state == VehicleState::Run {
            self.distance += sample.distance;
            self.max_speed = self.max_speed.max(sample.speed);
        }
    }

    fn finish(
        self,
        vehicle: &str,
        catalog: &GeofenceCatalog,
        config: &ReportConfig,
    ) -> TripSegment {
        let duration = (self.stop_time - self.start_time).num_seconds();
        debug_assert!(duration >= 0, "{}: samples out of order", vehicle);

        let avg_speed = if self.state == VehicleState::Run && duration > 0 {
            self.distance / (duration as f64 / 3600.0)
        } else {
            0.0
        };

        let location = if config.resolve_geofences {
            catalog
                .resolve(&self.origin)
                .map(|name| SegmentLocation::Geofence(name.to_string()))
                .unwrap_or(SegmentLocation::Coordinates(self.origin))
        } else {
            SegmentLocation::Coordinates(self.origin)
        };

        TripSegment {
            state: self.state,
            start_time: self.start_time,
            stop_time: self.stop_time,
            duration,
            distance: self.distance,
            avg_speed,
            max_speed: self.max_speed,
            location,
            first_sample: self.first_sample,
            sample_count: self.sample_count,
        }
    }
}

/// Coalesce a vehicle's time-ordered samples into trip segments.
///
/// `vehicle` only labels errors and log lines. Empty input yields no segments.
/// A sample earlier than its predecessor fails with [`ReportError::DataIntegrity`];
/// samples are never re-sorted.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use trip_report::{build_segments, GeofenceCatalog, PositionSample, ReportConfig, VehicleState};
///
/// let t0 = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(8, 0, 0).unwrap();
/// let sample = |secs: i64, speed: f64, ignition: bool| PositionSample {
///     time: t0 + chrono::Duration::seconds(secs),
///     latitude: 24.7,
///     longitude: 46.6,
///     speed,
///     distance: 0.0,
///     ignition,
///     valid: true,
/// };
/// let samples = vec![sample(0, 0.0, false), sample(60, 0.0, true), sample(120, 10.0, true)];
///
/// let catalog = GeofenceCatalog::empty();
/// let segments = build_segments("truck-1", &samples, &catalog, &ReportConfig::default()).unwrap();
/// let states: Vec<VehicleState> = segments.iter().map(|s| s.state).collect();
/// assert_eq!(states, vec![VehicleState::Parked, VehicleState::Idle, VehicleState::Run]);
/// ```
pub fn build_segments(
    vehicle: &str,
    samples: &[PositionSample],
    catalog: &GeofenceCatalog,
    config: &ReportConfig,
) -> Result<Vec<TripSegment>> {
    let classified = classify_samples(samples, config.idle_speed_threshold);
    let mut segments = Vec::new();
    let mut current: Option<SegmentBuilder> = None;

    for (idx, cs) in classified.iter().enumerate() {
        if idx > 0 {
            let prev = &samples[idx - 1];
            if cs.sample.time < prev.time {
                return Err(ReportError::integrity(
                    vehicle,
                    format!(
                        "sample {} at {} precedes previous sample at {}",
                        idx, cs.sample.time, prev.time
                    ),
                ));
            }
        }

        current = match current.take() {
            Some(mut seg) if seg.state == cs.state => {
                seg.extend(cs.sample);
                Some(seg)
            }
            Some(seg) => {
                segments.push(seg.finish(vehicle, catalog, config));
                Some(SegmentBuilder::start(idx, cs))
            }
            None => Some(SegmentBuilder::start(idx, cs)),
        };
    }

    if let Some(seg) = current {
        segments.push(seg.finish(vehicle, catalog, config));
    }

    debug!(
        "[Segments] {}: {} samples -> {} segments",
        vehicle,
        samples.len(),
        segments.len()
    );

    Ok(segments)
}
