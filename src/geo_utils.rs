//! # Geographic Utilities
//!
//! Core geographic computation utilities for geofence membership tests.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`compute_bounds`] | Bounding box of a set of points |
//! | [`circle_bounds`] | Bounding box of a haversine circle |
//! | [`point_in_ring`] | Ray-casting point-in-polygon test |
//!
//! ## Example
//!
//! ```rust
//! use trip_report::{GpsPoint, geo_utils};
//!
//! let depot = GpsPoint::new(24.7136, 46.6753);
//! let gate = GpsPoint::new(24.7146, 46.6753);
//!
//! let dist = geo_utils::haversine_distance(&depot, &gate);
//! assert!((dist - 111.0).abs() < 1.0);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a sphere.
//! It is what the circle geofence test uses; accuracy is within 0.3% which is far below
//! typical geofence radii.
//!
//! ### Ray Casting
//!
//! [`point_in_ring`] treats latitude/longitude as plane coordinates. Geofences are small
//! enough (site yards, camps, gates) that the planar approximation is indistinguishable
//! from a geodesic test.

use geo::{Distance, Haversine, Point};
use crate::{Bounds, GpsPoint};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface (spherical Earth, mean
/// radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use trip_report::{GpsPoint, geo_utils};
///
/// let riyadh = GpsPoint::new(24.7136, 46.6753);
/// let dammam = GpsPoint::new(26.4207, 50.0888);
///
/// let distance = geo_utils::haversine_distance(&riyadh, &dammam);
/// assert!((distance - 391_500.0).abs() < 5_000.0); // ~391 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Mean Earth radius in meters, the same sphere [`haversine_distance`] measures on.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

// Slack added to circle boxes so float rounding never puts a rim point outside
const BOUNDS_EPSILON_DEG: f64 = 1e-9;

/// Bounding box of every point within `radius` meters (haversine) of `center`.
///
/// The latitude extent is the radius as an arc on the mean-radius sphere. The
/// longitude extent is the widest east/west reach of the spherical cap, which
/// lies poleward of the center. When the cap touches a pole or the box would
/// cross the antimeridian, the box spans every longitude.
///
/// # Example
///
/// ```rust
/// use trip_report::{GpsPoint, geo_utils};
///
/// let center = GpsPoint::new(0.0, 0.0);
/// let bounds = geo_utils::circle_bounds(&center, 1_000.0);
///
/// let rim = GpsPoint::new(1_000.0 / 111_250.0, 0.0);
/// assert!(geo_utils::haversine_distance(&center, &rim) <= 1_000.0);
/// assert!(bounds.contains(&rim));
/// ```
pub fn circle_bounds(center: &GpsPoint, radius: f64) -> Bounds {
    let arc = radius / EARTH_RADIUS_M;
    let delta_lat = arc.to_degrees() + BOUNDS_EPSILON_DEG;

    let min_lat = center.latitude - delta_lat;
    let max_lat = center.latitude + delta_lat;
    let full_span = Bounds {
        min_lat: min_lat.max(-90.0),
        max_lat: max_lat.min(90.0),
        min_lng: -180.0,
        max_lng: 180.0,
    };

    if min_lat <= -90.0 || max_lat >= 90.0 {
        return full_span;
    }

    let reach = arc.sin() / center.latitude.to_radians().cos();
    if reach >= 1.0 {
        return full_span;
    }
    let delta_lng = reach.asin().to_degrees() + BOUNDS_EPSILON_DEG;

    let min_lng = center.longitude - delta_lng;
    let max_lng = center.longitude + delta_lng;
    if min_lng < -180.0 || max_lng > 180.0 {
        return full_span;
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of points.
///
/// For empty input, returns a bounds with MIN/MAX values that contains nothing.
///
/// # Example
///
/// ```rust
/// use trip_report::{GpsPoint, geo_utils};
///
/// let ring = vec![
///     GpsPoint::new(24.70, 46.60),
///     GpsPoint::new(24.72, 46.60),
///     GpsPoint::new(24.71, 46.65),
/// ];
///
/// let bounds = geo_utils::compute_bounds(&ring);
/// assert_eq!(bounds.min_lat, 24.70);
/// assert_eq!(bounds.max_lng, 46.65);
/// ```
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
    let mut min_lat = f64::MAX;
    let mut max_lat = f64::MIN;
    let mut min_lng = f64::MAX;
    let mut max_lng = f64::MIN;

    for p in points {
        min_lat = min_lat.min(p.latitude);
        max_lat = max_lat.max(p.latitude);
        min_lng = min_lng.min(p.longitude);
        max_lng = max_lng.max(p.longitude);
    }

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

// =============================================================================
// Point-in-Polygon
// =============================================================================

/// Ray-casting point-in-polygon test.
///
/// Casts a ray from `point` towards increasing longitude and counts edge crossings;
/// an odd count means inside. An edge counts when the point's latitude lies in the
/// half-open interval `[min(lat1, lat2), max(lat1, lat2))` and the intersection
/// longitude is strictly greater than the point's longitude. The half-open interval
/// means a ray passing exactly through a shared vertex is counted once, and
/// horizontal edges (constant latitude) never count.
///
/// The ring is implicitly closed; the last vertex connects back to the first.
///
/// # Example
///
/// ```rust
/// use trip_report::{GpsPoint, geo_utils};
///
/// let square = vec![
///     GpsPoint::new(0.0, 0.0),
///     GpsPoint::new(0.0, 10.0),
///     GpsPoint::new(10.0, 10.0),
///     GpsPoint::new(10.0, 0.0),
/// ];
///
/// assert!(geo_utils::point_in_ring(&GpsPoint::new(5.0, 5.0), &square));
/// assert!(!geo_utils::point_in_ring(&GpsPoint::new(15.0, 5.0), &square));
/// ```
pub fn point_in_ring(point: &GpsPoint, ring: &[GpsPoint]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    let y = point.latitude;
    let x = point.longitude;
    let mut inside = false;

    let mut prev = &ring[ring.len() - 1];
    for curr in ring {
        let (y1, y2) = (prev.latitude, curr.latitude);
        let (lo, hi) = if y1 < y2 { (y1, y2) } else { (y2, y1) };

        if y >= lo && y < hi {
            let x_cross = prev.longitude
                + (y - y1) * (curr.longitude - prev.longitude) / (y2 - y1);
            if x_cross > x {
                inside = !inside;
            }
        }

        prev = curr;
    }

    inside
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn square() -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(0.0, 10.0),
            GpsPoint::new(10.0, 10.0),
            GpsPoint::new(10.0, 0.0),
        ]
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(24.7136, 46.6753);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let a = GpsPoint::new(24.0, 46.0);
        let b = GpsPoint::new(25.0, 46.0);
        assert!(approx_eq(haversine_distance(&a, &b), 111_195.0, 100.0));
    }

    #[test]
    fn test_compute_bounds() {
        let bounds = compute_bounds(&square());
        assert_eq!(bounds.min_lat, 0.0);
        assert_eq!(bounds.max_lat, 10.0);
        assert_eq!(bounds.min_lng, 0.0);
        assert_eq!(bounds.max_lng, 10.0);
    }

    #[test]
    fn test_circle_bounds_equator_rim() {
        // 1 km north of the equator is ~0.11% more than 1000/111_320 degrees
        let center = GpsPoint::new(0.0, 0.0);
        let bounds = circle_bounds(&center, 1_000.0);

        let north = GpsPoint::new(1_000.0 / 111_250.0, 0.0);
        let east = GpsPoint::new(0.0, 1_000.0 / 111_250.0);
        assert!(haversine_distance(&center, &north) <= 1_000.0);
        assert!(haversine_distance(&center, &east) <= 1_000.0);
        assert!(bounds.contains(&north));
        assert!(bounds.contains(&east));
    }

    #[test]
    fn test_circle_bounds_high_latitude() {
        let center = GpsPoint::new(88.0, 0.0);
        let bounds = circle_bounds(&center, 5_000.0);

        let east = GpsPoint::new(88.0, 1.0);
        assert!(haversine_distance(&center, &east) <= 5_000.0);
        assert!(bounds.contains(&east));
        assert!(bounds.max_lng < 180.0);
    }

    #[test]
    fn test_circle_bounds_pole_and_antimeridian() {
        let polar = circle_bounds(&GpsPoint::new(89.99, 0.0), 5_000.0);
        assert_eq!(polar.min_lng, -180.0);
        assert_eq!(polar.max_lng, 180.0);
        assert_eq!(polar.max_lat, 90.0);

        let dateline = circle_bounds(&GpsPoint::new(10.0, 179.999), 1_000.0);
        assert_eq!(dateline.min_lng, -180.0);
        assert_eq!(dateline.max_lng, 180.0);
        assert!(dateline.contains(&GpsPoint::new(10.0, -179.999)));
    }

    #[test]
    fn test_point_in_square() {
        assert!(point_in_ring(&GpsPoint::new(5.0, 5.0), &square()));
        assert!(!point_in_ring(&GpsPoint::new(15.0, 5.0), &square()));
        assert!(!point_in_ring(&GpsPoint::new(5.0, -1.0), &square()));
        assert!(!point_in_ring(&GpsPoint::new(5.0, 11.0), &square()));
    }

    #[test]
    fn test_ray_through_vertex_counted_once() {
        // Diamond whose left and right vertices sit on the ray at latitude 5
        let diamond = vec![
            GpsPoint::new(0.0, 5.0),
            GpsPoint::new(5.0, 10.0),
            GpsPoint::new(10.0, 5.0),
            GpsPoint::new(5.0, 0.0),
        ];
        assert!(point_in_ring(&GpsPoint::new(5.0, 5.0), &diamond));
        assert!(!point_in_ring(&GpsPoint::new(5.0, 12.0), &diamond));
        assert!(!point_in_ring(&GpsPoint::new(5.0, -2.0), &diamond));
    }

    #[test]
    fn test_edge_convention() {
        // Bottom edge is inside (half-open interval includes the minimum),
        // top edge is outside.
        assert!(point_in_ring(&GpsPoint::new(0.0, 5.0), &square()));
        assert!(!point_in_ring(&GpsPoint::new(10.0, 5.0), &square()));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape: notch cut from the top between lng 3 and 7
        let u = vec![
            GpsPoint::new(0.0, 0.0),
            GpsPoint::new(10.0, 0.0),
            GpsPoint::new(10.0, 3.0),
            GpsPoint::new(4.0, 3.0),
            GpsPoint::new(4.0, 7.0),
            GpsPoint::new(10.0, 7.0),
            GpsPoint::new(10.0, 10.0),
            GpsPoint::new(0.0, 10.0),
        ];
        assert!(point_in_ring(&GpsPoint::new(2.0, 5.0), &u));
        assert!(!point_in_ring(&GpsPoint::new(8.0, 5.0), &u));
        assert!(point_in_ring(&GpsPoint::new(8.0, 1.5), &u));
        assert!(point_in_ring(&GpsPoint::new(8.0, 8.5), &u));
    }

    #[test]
    fn test_degenerate_ring() {
        let line = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(1.0, 1.0)];
        assert!(!point_in_ring(&GpsPoint::new(0.5, 0.5), &line));
    }
}
