//! # Trip Report
//!
//! Vehicle trip segmentation and geofence resolution for GPS fleet reports.
//!
//! This library turns raw, irregularly-sampled position records into an auditable
//! trip report:
//! - Classifies every fix as run, idle or parked from speed and ignition
//! - Coalesces consecutive fixes into trip segments with duration, distance and speed
//! - Labels each segment with the first matching geofence (polygon or circle)
//! - Aggregates per-vehicle and fleet-wide totals, isolating per-vehicle failures
//!
//! ## Features
//!
//! - **`parallel`** - Process one vehicle per rayon task in fleet reports
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trip_report::{
//!     build_trip_report, DateRange, GeofenceCatalog, GeofenceCircle, GpsPoint,
//!     InMemoryFeed, PositionSample, ReportConfig, Vehicle,
//! };
//!
//! let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
//! let fix = |h: u32, m: u32, speed: f64, distance: f64, ignition: bool| PositionSample {
//!     time: day.and_hms_opt(h, m, 0).unwrap(),
//!     latitude: 24.0,
//!     longitude: 46.0,
//!     speed,
//!     distance,
//!     ignition,
//!     valid: true,
//! };
//!
//! let feed = InMemoryFeed::new().with_positions("dev-1", vec![
//!     fix(8, 0, 0.0, 0.0, false),
//!     fix(8, 10, 0.0, 0.0, true),
//!     fix(8, 15, 40.0, 1.0, true),
//!     fix(8, 45, 60.0, 25.0, true),
//! ]);
//!
//! let yard = GeofenceCircle::new("Main Yard", GpsPoint::new(24.0, 46.0), 300.0).unwrap();
//! let catalog = GeofenceCatalog::new(vec![yard.into()]);
//!
//! let summary = build_trip_report(
//!     &feed,
//!     &catalog,
//!     &Vehicle::new("dev-1", "Bus 12"),
//!     &DateRange::day(day),
//!     &ReportConfig::default(),
//! ).unwrap();
//!
//! assert_eq!(summary.segments.len(), 3);
//! assert_eq!(summary.run_duration, 30 * 60);
//! assert_eq!(summary.run_distance, 26.0);
//! ```

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub mod error;
pub use error::{ReportError, Result};

pub mod geo_utils;

// Collaborator traits, vehicle identity and report period
pub mod feed;
pub use feed::{
    ignition_from_payload, DateRange, GeofenceRecord, GeofenceSource, InMemoryFeed,
    PositionSource, Vehicle,
};

pub mod classify;
pub use classify::{
    classify, classify_samples, ClassifiedSample, PositionSample, VehicleState,
    DEFAULT_IDLE_SPEED_THRESHOLD,
};

pub mod geofence;
pub use geofence::{Geofence, GeofenceCatalog, GeofenceCircle, GeofencePolygon};

pub mod segments;
pub use segments::{build_segments, SegmentLocation, TripSegment};

pub mod report;
pub use report::{
    format_duration, summarize, summarize_fleet, DurationColumns, FleetReport, FleetSummary,
    VehicleFailure, VehicleTripSummary,
};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trip_report::GpsPoint;
/// let point = GpsPoint::new(24.7136, 46.6753); // Riyadh
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from GPS points.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        Some(geo_utils::compute_bounds(points))
    }

    /// Check whether a point lies inside or on the edge of the box.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Configuration for report generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Speed (km/h) at or below which a vehicle with ignition on is idle.
    /// Default: 2.0
    pub idle_speed_threshold: f64,

    /// Resolve segment locations against the geofence catalog.
    /// When false every segment keeps its raw coordinate. Default: true
    pub resolve_geofences: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            idle_speed_threshold: DEFAULT_IDLE_SPEED_THRESHOLD,
            resolve_geofences: true,
        }
    }
}

// ============================================================================
// Report Builders
// ============================================================================

/// Build a vehicle summary from samples that are already in memory.
///
/// Fails only with [`ReportError::DataIntegrity`].
pub fn summarize_samples(
    vehicle: Vehicle,
    samples: &[PositionSample],
    catalog: &GeofenceCatalog,
    config: &ReportConfig,
) -> Result<VehicleTripSummary> {
    let segments = build_segments(&vehicle.id, samples, catalog, config)?;
    Ok(summarize(vehicle, segments))
}

/// Fetch one vehicle's samples for the period and build its trip summary.
///
/// An empty period yields an all-zero summary. Feed failures surface as
/// [`ReportError::DataUnavailable`]; unordered samples as
/// [`ReportError::DataIntegrity`].
pub fn build_trip_report<P: PositionSource + ?Sized>(
    positions: &P,
    catalog: &GeofenceCatalog,
    vehicle: &Vehicle,
    range: &DateRange,
    config: &ReportConfig,
) -> Result<VehicleTripSummary> {
    let samples = positions.positions(vehicle, range)?;
    debug!(
        "[TripReport] {}: {} samples for {}",
        vehicle,
        samples.len(),
        range
    );
    summarize_samples(vehicle.clone(), &samples, catalog, config)
}

/// Build trip summaries for a set of vehicles plus fleet totals.
///
/// A vehicle whose samples violate ordering is reported in
/// [`FleetReport::failures`] and excluded from the totals; the other vehicles
/// are unaffected. A feed failure for any vehicle fails the whole report.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use trip_report::{
///     build_fleet_report, DateRange, GeofenceCatalog, InMemoryFeed, ReportConfig, Vehicle,
/// };
///
/// let day = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
/// let vehicles = vec![Vehicle::new("1", "Bus 1"), Vehicle::new("2", "Bus 2")];
///
/// let report = build_fleet_report(
///     &InMemoryFeed::new(),
///     &GeofenceCatalog::empty(),
///     &vehicles,
///     &DateRange::day(day),
///     &ReportConfig::default(),
/// ).unwrap();
///
/// assert_eq!(report.summary.vehicle_count, 2);
/// assert_eq!(report.summary.total_duration(), 0);
/// ```
pub fn build_fleet_report<P: PositionSource + ?Sized>(
    positions: &P,
    catalog: &GeofenceCatalog,
    vehicles: &[Vehicle],
    range: &DateRange,
    config: &ReportConfig,
) -> Result<FleetReport> {
    let start = Instant::now();

    let mut outcomes = Vec::with_capacity(vehicles.len());
    for vehicle in vehicles {
        let samples = positions.positions(vehicle, range)?;
        outcomes.push(summarize_samples(vehicle.clone(), &samples, catalog, config));
    }

    let report = assemble_fleet_report(range, vehicles, outcomes)?;
    info!(
        "[TripReport] Fleet report for {}: {} vehicles, {} failed, {} segments in {:?}",
        range,
        report.vehicles.len(),
        report.failures.len(),
        report.vehicles.iter().map(|v| v.segments.len()).sum::<usize>(),
        start.elapsed()
    );

    Ok(report)
}

/// Build a fleet report using parallel processing.
///
/// Same semantics and output as [`build_fleet_report`], with one vehicle per
/// rayon task. The catalog is shared read-only across tasks.
#[cfg(feature = "parallel")]
pub fn build_fleet_report_parallel<P: PositionSource + ?Sized>(
    positions: &P,
    catalog: &GeofenceCatalog,
    vehicles: &[Vehicle],
    range: &DateRange,
    config: &ReportConfig,
) -> Result<FleetReport> {
    use rayon::prelude::*;

    let start = Instant::now();

    let outcomes: Vec<Result<VehicleTripSummary>> = vehicles
        .par_iter()
        .map(|vehicle| -> Result<Result<VehicleTripSummary>> {
            let samples = positions.positions(vehicle, range)?;
            Ok(summarize_samples(vehicle.clone(), &samples, catalog, config))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = assemble_fleet_report(range, vehicles, outcomes)?;
    info!(
        "[TripReport] PARALLEL fleet report for {}: {} vehicles, {} failed in {:?}",
        range,
        report.vehicles.len(),
        report.failures.len(),
        start.elapsed()
    );

    Ok(report)
}

/// Split per-vehicle outcomes into summaries and failures, then total them.
fn assemble_fleet_report(
    range: &DateRange,
    vehicles: &[Vehicle],
    outcomes: Vec<Result<VehicleTripSummary>>,
) -> Result<FleetReport> {
    let mut summaries = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();

    for (vehicle, outcome) in vehicles.iter().zip(outcomes) {
        match outcome {
            Ok(summary) => summaries.push(summary),
            Err(e) if e.is_per_vehicle() => {
                warn!("[TripReport] Skipping {}: {}", vehicle, e);
                failures.push(VehicleFailure {
                    vehicle: vehicle.clone(),
                    reason: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    summaries.sort_by(|a, b| {
        (&a.vehicle.name, &a.vehicle.id).cmp(&(&b.vehicle.name, &b.vehicle.id))
    });
    failures.sort_by(|a, b| {
        (&a.vehicle.name, &a.vehicle.id).cmp(&(&b.vehicle.name, &b.vehicle.id))
    });

    Ok(FleetReport {
        summary: summarize_fleet(*range, &summaries),
        vehicles: summaries,
        failures,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn fix(h: u32, m: u32, speed: f64, distance: f64, ignition: bool) -> PositionSample {
        PositionSample {
            time: day().and_hms_opt(h, m, 0).unwrap(),
            latitude: 24.0,
            longitude: 46.0,
            speed,
            distance,
            ignition,
            valid: true,
        }
    }

    struct DownFeed;

    impl PositionSource for DownFeed {
        fn positions(&self, _vehicle: &Vehicle, _range: &DateRange) -> Result<Vec<PositionSample>> {
            Err(ReportError::unavailable("position feed", "tunnel closed"))
        }
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(24.7136, 46.6753).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_bounds_contains() {
        let b = Bounds::from_points(&[GpsPoint::new(0.0, 0.0), GpsPoint::new(2.0, 3.0)]).unwrap();
        assert!(b.contains(&GpsPoint::new(1.0, 1.0)));
        assert!(b.contains(&GpsPoint::new(2.0, 3.0)));
        assert!(!b.contains(&GpsPoint::new(2.1, 1.0)));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config = ReportConfig::default();
        assert_eq!(config.idle_speed_threshold, 2.0);
        assert!(config.resolve_geofences);

        let parsed: ReportConfig =
            serde_json::from_str(r#"{"idle_speed_threshold": 5.0}"#).unwrap();
        assert_eq!(parsed.idle_speed_threshold, 5.0);
        assert!(parsed.resolve_geofences);
    }

    #[test]
    fn test_build_trip_report_empty_period() {
        let summary = build_trip_report(
            &InMemoryFeed::new(),
            &GeofenceCatalog::empty(),
            &Vehicle::new("1", "Bus 1"),
            &DateRange::day(day()),
            &ReportConfig::default(),
        )
        .unwrap();
        assert!(summary.segments.is_empty());
        assert_eq!(summary.total_duration(), 0);
        assert_eq!(summary.run_distance, 0.0);
    }

    #[test]
    fn test_feed_failure_fails_report() {
        let vehicles = vec![Vehicle::new("1", "Bus 1")];
        let err = build_fleet_report(
            &DownFeed,
            &GeofenceCatalog::empty(),
            &vehicles,
            &DateRange::day(day()),
            &ReportConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::DataUnavailable { .. }));
    }

    #[test]
    fn test_fleet_isolates_integrity_failures() {
        let feed = InMemoryFeed::new()
            .with_positions("good", vec![fix(8, 0, 0.0, 0.0, true), fix(8, 30, 50.0, 20.0, true)])
            .with_positions("bad", vec![fix(9, 0, 0.0, 0.0, true), fix(8, 0, 0.0, 0.0, true)]);
        let vehicles = vec![Vehicle::new("bad", "Alpha"), Vehicle::new("good", "Bravo")];

        let report = build_fleet_report(
            &feed,
            &GeofenceCatalog::empty(),
            &vehicles,
            &DateRange::day(day()),
            &ReportConfig::default(),
        )
        .unwrap();

        assert_eq!(report.vehicles.len(), 1);
        assert_eq!(report.vehicles[0].vehicle.id, "good");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].vehicle.id, "bad");
        assert!(!report.is_complete());
        assert_eq!(report.summary.vehicle_count, 1);
        assert!((report.summary.run_distance - 20.0).abs() < 1e-9);
    }
}
