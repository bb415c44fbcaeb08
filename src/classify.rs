//! Per-sample vehicle state classification.
//!
//! Each GPS fix is mapped to one of three states using only its speed and
//! ignition signal:
//!
//! 1. Ignition off ⇒ [`VehicleState::Parked`], whatever the reported speed
//!    (motion with the engine off is sensor noise).
//! 2. Ignition on and speed at or below the idle threshold ⇒ [`VehicleState::Idle`].
//! 3. Otherwise ⇒ [`VehicleState::Run`].
//!
//! The mapping does not look at neighbouring samples, ordering or time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::GpsPoint;

/// Default speed cutoff (km/h) separating idle from run.
pub const DEFAULT_IDLE_SPEED_THRESHOLD: f64 = 2.0;

/// One GPS fix as delivered by the position feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Device local time, second precision
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    /// Reported speed in km/h
    pub speed: f64,
    /// Distance travelled since the previous sample, in km
    pub distance: f64,
    /// Engine-on signal decoded from the sensor payload
    pub ignition: bool,
    /// Fix validity flag reported by the device
    pub valid: bool,
}

impl PositionSample {
    /// Coordinate of this fix.
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// Discrete vehicle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleState {
    Run,
    Idle,
    Parked,
}

impl VehicleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleState::Run => "run",
            VehicleState::Idle => "idle",
            VehicleState::Parked => "parked",
        }
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A position sample together with its derived state.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedSample<'a> {
    pub sample: &'a PositionSample,
    pub state: VehicleState,
}

/// Classify a single sample.
///
/// Total over every speed/ignition combination: ignition off always wins,
/// then `speed <= idle_speed_threshold` is idle, anything faster is run.
///
/// # Example
/// ```
/// use trip_report::{classify, VehicleState};
///
/// assert_eq!(classify(80.0, false, 2.0), VehicleState::Parked);
/// assert_eq!(classify(2.0, true, 2.0), VehicleState::Idle);
/// assert_eq!(classify(2.1, true, 2.0), VehicleState::Run);
/// ```
pub fn classify(speed: f64, ignition: bool, idle_speed_threshold: f64) -> VehicleState {
    if !ignition {
        VehicleState::Parked
    } else if speed <= idle_speed_threshold {
        VehicleState::Idle
    } else {
        VehicleState::Run
    }
}

/// Classify every sample in order.
pub fn classify_samples(
    samples: &[PositionSample],
    idle_speed_threshold: f64,
) -> Vec<ClassifiedSample<'_>> {
    samples
        .iter()
        .map(|sample| ClassifiedSample {
            sample,
            state: classify(sample.speed, sample.ignition, idle_speed_threshold),
        })
        .collect()
}
