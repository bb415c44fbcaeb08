//! Error types for trip report generation.
//!
//! Two failure classes matter to callers:
//!
//! - [`ReportError::DataUnavailable`] fails the whole report: a feed could not
//!   be read, so nothing trustworthy can be produced.
//! - [`ReportError::DataIntegrity`] is scoped to one vehicle: its samples broke
//!   a structural precondition. Fleet reports record it and carry on with the
//!   remaining vehicles.

use thiserror::Error;

/// Errors produced while loading catalogs or building trip reports.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReportError {
    /// An upstream position or geofence feed could not be read.
    #[error("{source_name} unavailable: {reason}")]
    DataUnavailable { source_name: String, reason: String },

    /// A structural precondition was violated (e.g. timestamps out of order).
    #[error("data integrity violation for {vehicle}: {reason}")]
    DataIntegrity { vehicle: String, reason: String },

    /// A geofence record could not be decoded into a usable shape.
    #[error("invalid geofence '{name}': {reason}")]
    InvalidGeofence { name: String, reason: String },
}

impl ReportError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn integrity(vehicle: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataIntegrity {
            vehicle: vehicle.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_geofence(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeofence {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for failures that only affect a single vehicle's computation.
    pub fn is_per_vehicle(&self) -> bool {
        matches!(self, Self::DataIntegrity { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ReportError>;
