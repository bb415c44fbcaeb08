//! Per-vehicle and fleet-wide aggregation, plus duration formatting.
//!
//! Aggregation is a straight linear reduction over segments: no weighting and
//! no outlier rejection. Inputs have already been validated by the segment
//! builder, so nothing here can fail except formatting a negative duration.

use serde::{Deserialize, Serialize};

use crate::classify::VehicleState;
use crate::error::{ReportError, Result};
use crate::feed::{DateRange, Vehicle};
use crate::segments::TripSegment;

/// Trip segments and totals for one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTripSummary {
    pub vehicle: Vehicle,
    /// Segments in time order
    pub segments: Vec<TripSegment>,
    /// Seconds spent in run segments
    pub run_duration: i64,
    /// Seconds spent in idle segments
    pub idle_duration: i64,
    /// Seconds spent in parked segments
    pub parked_duration: i64,
    /// Kilometres travelled in run segments
    pub run_distance: f64,
    /// Number of run segments
    pub trip_count: usize,
    /// Highest speed seen in any run segment (km/h)
    pub max_speed: f64,
    /// Number of position samples the segments were built from
    pub sample_count: usize,
}

/// Formatted `D:HH:MM:SS` duration columns for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DurationColumns {
    pub run: String,
    pub idle: String,
    pub parked: String,
    pub total: String,
}

impl VehicleTripSummary {
    pub fn total_duration(&self) -> i64 {
        self.run_duration + self.idle_duration + self.parked_duration
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn formatted_durations(&self) -> Result<DurationColumns> {
        Ok(DurationColumns {
            run: format_duration(self.run_duration)?,
            idle: format_duration(self.idle_duration)?,
            parked: format_duration(self.parked_duration)?,
            total: format_duration(self.total_duration())?,
        })
    }
}

/// Totals across every successfully processed vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetSummary {
    pub period: DateRange,
    pub vehicle_count: usize,
    pub run_duration: i64,
    pub idle_duration: i64,
    pub parked_duration: i64,
    pub run_distance: f64,
    pub trip_count: usize,
    pub max_speed: f64,
}

impl FleetSummary {
    pub fn total_duration(&self) -> i64 {
        self.run_duration + self.idle_duration + self.parked_duration
    }
}

/// A vehicle whose computation was abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleFailure {
    pub vehicle: Vehicle,
    pub reason: String,
}

/// Result of a fleet run: per-vehicle summaries, failures and the fleet totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetReport {
    pub summary: FleetSummary,
    /// Successful vehicles, ordered by name then id
    pub vehicles: Vec<VehicleTripSummary>,
    /// Vehicles that failed with a data integrity error
    pub failures: Vec<VehicleFailure>,
}

impl FleetReport {
    pub fn vehicle(&self, id: &str) -> Option<&VehicleTripSummary> {
        self.vehicles.iter().find(|v| v.vehicle.id == id)
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reduce one vehicle's segments into a summary.
pub fn summarize(vehicle: Vehicle, segments: Vec<TripSegment>) -> VehicleTripSummary {
    let mut summary = VehicleTripSummary {
        vehicle,
        segments: Vec::new(),
        run_duration: 0,
        idle_duration: 0,
        parked_duration: 0,
        run_distance: 0.0,
        trip_count: 0,
        max_speed: 0.0,
        sample_count: 0,
    };

    for seg in &segments {
        summary.sample_count += seg.sample_count;
        match seg.state {
            VehicleState::Run => {
                summary.run_duration += seg.duration;
                summary.run_distance += seg.distance;
                summary.trip_count += 1;
                summary.max_speed = summary.max_speed.max(seg.max_speed);
            }
            VehicleState::Idle => summary.idle_duration += seg.duration,
            VehicleState::Parked => summary.parked_duration += seg.duration,
        }
    }

    summary.segments = segments;
    summary
}

/// Sum vehicle summaries into fleet totals.
pub fn summarize_fleet(period: DateRange, vehicles: &[VehicleTripSummary]) -> FleetSummary {
    vehicles.iter().fold(
        FleetSummary {
            period,
            vehicle_count: 0,
            run_duration: 0,
            idle_duration: 0,
            parked_duration: 0,
            run_distance: 0.0,
            trip_count: 0,
            max_speed: 0.0,
        },
        |mut acc, v| {
            acc.vehicle_count += 1;
            acc.run_duration += v.run_duration;
            acc.idle_duration += v.idle_duration;
            acc.parked_duration += v.parked_duration;
            acc.run_distance += v.run_distance;
            acc.trip_count += v.trip_count;
            acc.max_speed = acc.max_speed.max(v.max_speed);
            acc
        },
    )
}

/// Render elapsed seconds as `D:HH:MM:SS`.
///
/// Days are unbounded; hours, minutes and seconds are zero-padded to two
/// digits. Negative input is a [`ReportError::DataIntegrity`] error.
///
/// # Example
/// ```
/// use trip_report::format_duration;
///
/// assert_eq!(format_duration(0).unwrap(), "0:00:00:00");
/// assert_eq!(format_duration(93_784).unwrap(), "1:02:03:04");
/// assert!(format_duration(-1).is_err());
/// ```
pub fn format_duration(total_seconds: i64) -> Result<String> {
    if total_seconds < 0 {
        return Err(ReportError::integrity(
            "duration formatter",
            format!("negative duration {}s", total_seconds),
        ));
    }

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    Ok(format!("{}:{:02}:{:02}:{:02}", days, hours, minutes, seconds))
}
