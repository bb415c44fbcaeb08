//! Geofence catalog and point-to-geofence resolution.
//!
//! A [`GeofenceCatalog`] is loaded once per report run and shared read-only by
//! every vehicle computation. [`GeofenceCatalog::resolve`] returns the name of
//! the **first** geofence, in catalog order, that contains a point.
//!
//! Lookups go through an R-tree of shape bounding boxes to find candidates;
//! the exact shape tests then run in ascending catalog order so the R-tree
//! never changes which geofence wins.

use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::feed::{GeofenceRecord, GeofenceSource};
use crate::geo_utils::{circle_bounds, compute_bounds, haversine_distance, point_in_ring};
use crate::{Bounds, GpsPoint};

// ============================================================================
// Shapes
// ============================================================================

/// Named polygon geofence. Vertices are assumed non-self-intersecting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofencePolygon {
    pub name: String,
    pub vertices: Vec<GpsPoint>,
}

impl GeofencePolygon {
    /// Build a polygon, dropping a trailing vertex that repeats the first.
    ///
    /// Fails if fewer than 3 distinct vertices remain or any vertex is invalid.
    pub fn new(name: impl Into<String>, mut vertices: Vec<GpsPoint>) -> Result<Self> {
        let name = name.into();

        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(ReportError::invalid_geofence(
                name,
                format!("polygon needs at least 3 vertices, got {}", vertices.len()),
            ));
        }
        if let Some(bad) = vertices.iter().find(|v| !v.is_valid()) {
            return Err(ReportError::invalid_geofence(
                name,
                format!("invalid vertex ({}, {})", bad.latitude, bad.longitude),
            ));
        }

        Ok(Self { name, vertices })
    }

    pub fn contains(&self, point: &GpsPoint) -> bool {
        point_in_ring(point, &self.vertices)
    }

    pub fn bounds(&self) -> Bounds {
        compute_bounds(&self.vertices)
    }
}

/// Named circular geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceCircle {
    pub name: String,
    pub center: GpsPoint,
    /// Radius in meters
    pub radius: f64,
}

impl GeofenceCircle {
    pub fn new(name: impl Into<String>, center: GpsPoint, radius: f64) -> Result<Self> {
        let name = name.into();

        if !center.is_valid() {
            return Err(ReportError::invalid_geofence(
                name,
                format!("invalid center ({}, {})", center.latitude, center.longitude),
            ));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ReportError::invalid_geofence(
                name,
                format!("radius must be positive, got {}", radius),
            ));
        }

        Ok(Self { name, center, radius })
    }

    /// Great-circle distance to the center is at most the radius.
    pub fn contains(&self, point: &GpsPoint) -> bool {
        haversine_distance(point, &self.center) <= self.radius
    }

    pub fn bounds(&self) -> Bounds {
        circle_bounds(&self.center, self.radius)
    }
}

/// A geofence of either shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Geofence {
    Polygon(GeofencePolygon),
    Circle(GeofenceCircle),
}

impl Geofence {
    pub fn name(&self) -> &str {
        match self {
            Geofence::Polygon(p) => &p.name,
            Geofence::Circle(c) => &c.name,
        }
    }

    pub fn contains(&self, point: &GpsPoint) -> bool {
        match self {
            Geofence::Polygon(p) => p.contains(point),
            Geofence::Circle(c) => c.contains(point),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Geofence::Polygon(p) => p.bounds(),
            Geofence::Circle(c) => c.bounds(),
        }
    }
}

impl From<GeofencePolygon> for Geofence {
    fn from(p: GeofencePolygon) -> Self {
        Geofence::Polygon(p)
    }
}

impl From<GeofenceCircle> for Geofence {
    fn from(c: GeofenceCircle) -> Self {
        Geofence::Circle(c)
    }
}

// ============================================================================
// Record Decoding
// ============================================================================

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl From<LatLng> for GpsPoint {
    fn from(ll: LatLng) -> Self {
        GpsPoint::new(ll.lat, ll.lng)
    }
}

impl TryFrom<&GeofenceRecord> for Geofence {
    type Error = ReportError;

    fn try_from(record: &GeofenceRecord) -> Result<Self> {
        let name = record.name.as_str();
        let missing =
            |field: &str| ReportError::invalid_geofence(name, format!("missing {}", field));
        let malformed = |field: &str, e: serde_json::Error| {
            ReportError::invalid_geofence(name, format!("malformed {}: {}", field, e))
        };

        match record.kind.trim().to_ascii_lowercase().as_str() {
            "polygon" => {
                let raw = record.coordinates.as_deref().ok_or_else(|| missing("coordinates"))?;
                let coords: Vec<LatLng> =
                    serde_json::from_str(raw).map_err(|e| malformed("coordinates", e))?;
                let vertices = coords.into_iter().map(GpsPoint::from).collect();
                Ok(GeofencePolygon::new(name, vertices)?.into())
            }
            "circle" => {
                let raw = record.center.as_deref().ok_or_else(|| missing("center"))?;
                let center: LatLng = serde_json::from_str(raw).map_err(|e| malformed("center", e))?;
                let radius = record.radius.ok_or_else(|| missing("radius"))?;
                Ok(GeofenceCircle::new(name, center.into(), radius)?.into())
            }
            other => Err(ReportError::invalid_geofence(
                name,
                format!("unknown geofence type '{}'", other),
            )),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Bounding box of one catalog entry (used for spatial indexing).
#[derive(Debug, Clone)]
struct GeofenceBounds {
    idx: usize,
    bounds: Bounds,
}

impl RTreeObject for GeofenceBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// Immutable, ordered set of geofences for one report run.
#[derive(Debug, Clone)]
pub struct GeofenceCatalog {
    geofences: Vec<Geofence>,
    index: RTree<GeofenceBounds>,
}

impl Default for GeofenceCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeofenceCatalog {
    /// Build a catalog; the order of `geofences` is the match precedence.
    pub fn new(geofences: Vec<Geofence>) -> Self {
        let bounds: Vec<GeofenceBounds> = geofences
            .iter()
            .enumerate()
            .map(|(idx, g)| GeofenceBounds { idx, bounds: g.bounds() })
            .collect();

        Self {
            geofences,
            index: RTree::bulk_load(bounds),
        }
    }

    /// A catalog with no geofences; every lookup falls back to coordinates.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Decode records in order. Any undecodable record fails the whole load.
    pub fn from_records(records: &[GeofenceRecord]) -> Result<Self> {
        let geofences = records
            .iter()
            .map(Geofence::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(geofences))
    }

    /// Load a user's geofences from the feed.
    ///
    /// An empty result is a valid, empty catalog. Feed failures propagate as
    /// [`ReportError::DataUnavailable`].
    pub fn load<S: GeofenceSource + ?Sized>(source: &S, user_id: u64) -> Result<Self> {
        let records = source.geofences(user_id)?;
        let catalog = Self::from_records(&records)?;
        debug!(
            "[GeofenceCatalog] Loaded {} geofences for user {}",
            catalog.len(),
            user_id
        );
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.geofences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geofences.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Geofence> {
        self.geofences.iter()
    }

    /// First geofence (in catalog order) containing `point`.
    pub fn find(&self, point: &GpsPoint) -> Option<&Geofence> {
        if self.geofences.is_empty() || !point.is_valid() {
            return None;
        }

        let probe = AABB::from_point([point.longitude, point.latitude]);
        let mut candidates: Vec<usize> = self
            .index
            .locate_in_envelope_intersecting(&probe)
            .map(|b| b.idx)
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .map(|idx| &self.geofences[idx])
            .find(|g| g.contains(point))
    }

    /// Name of the first geofence containing `point`, if any.
    ///
    /// # Example
    /// ```
    /// use trip_report::{GeofenceCatalog, GeofenceCircle, GpsPoint};
    ///
    /// let yard = GeofenceCircle::new("Main Yard", GpsPoint::new(24.0, 46.0), 500.0).unwrap();
    /// let catalog = GeofenceCatalog::new(vec![yard.into()]);
    ///
    /// assert_eq!(catalog.resolve(&GpsPoint::new(24.001, 46.0)), Some("Main Yard"));
    /// assert_eq!(catalog.resolve(&GpsPoint::new(24.1, 46.0)), None);
    /// ```
    pub fn resolve(&self, point: &GpsPoint) -> Option<&str> {
        self.find(point).map(Geofence::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Meters per degree of latitude on the mean-radius sphere
    const M_PER_DEG: f64 = 111_195.08;

    fn square(name: &str) -> Geofence {
        GeofencePolygon::new(
            name,
            vec![
                GpsPoint::new(0.0, 0.0),
                GpsPoint::new(0.0, 10.0),
                GpsPoint::new(10.0, 10.0),
                GpsPoint::new(10.0, 0.0),
            ],
        )
        .unwrap()
        .into()
    }

    #[test]
    fn test_polygon_scenario() {
        let catalog = GeofenceCatalog::new(vec![square("Square")]);
        assert_eq!(catalog.resolve(&GpsPoint::new(5.0, 5.0)), Some("Square"));
        assert_eq!(catalog.resolve(&GpsPoint::new(15.0, 5.0)), None);
    }

    #[test]
    fn test_circle_scenario() {
        let circle = GeofenceCircle::new("Camp", GpsPoint::new(24.0, 46.0), 500.0).unwrap();
        let near = GpsPoint::new(24.0 + 300.0 / M_PER_DEG, 46.0);
        let far = GpsPoint::new(24.0 + 800.0 / M_PER_DEG, 46.0);

        assert!(circle.contains(&near));
        assert!(!circle.contains(&far));

        let catalog = GeofenceCatalog::new(vec![circle.into()]);
        assert_eq!(catalog.resolve(&near), Some("Camp"));
        assert_eq!(catalog.resolve(&far), None);
    }

    #[test]
    fn test_circle_east_west() {
        // Longitude degrees are shorter away from the equator; the bounding box
        // must still include points on the east/west rim.
        let center = GpsPoint::new(60.0, 10.0);
        let circle = GeofenceCircle::new("North", center, 1_000.0).unwrap();
        let east = GpsPoint::new(60.0, 10.0 + 900.0 / (M_PER_DEG * 0.5));
        assert!(circle.contains(&east));

        let catalog = GeofenceCatalog::new(vec![circle.into()]);
        assert_eq!(catalog.resolve(&east), Some("North"));
    }

    #[test]
    fn test_circle_rim_at_equator_resolves() {
        let circle = GeofenceCircle::new("Equator Yard", GpsPoint::new(0.0, 0.0), 1_000.0).unwrap();
        let rim = GpsPoint::new(1_000.0 / 111_250.0, 0.0);
        assert!(circle.contains(&rim));

        let catalog = GeofenceCatalog::new(vec![circle.into()]);
        assert_eq!(catalog.resolve(&rim), Some("Equator Yard"));
    }

    #[test]
    fn test_circle_rim_at_high_latitude_resolves() {
        let circle = GeofenceCircle::new("Polar Camp", GpsPoint::new(88.0, 0.0), 5_000.0).unwrap();
        let east = GpsPoint::new(88.0, 1.0);
        assert!(circle.contains(&east));

        let catalog = GeofenceCatalog::new(vec![circle.into()]);
        assert_eq!(catalog.resolve(&east), Some("Polar Camp"));
    }

    #[test]
    fn test_circle_across_antimeridian_resolves() {
        let circle =
            GeofenceCircle::new("Dateline", GpsPoint::new(-17.0, 179.998), 2_000.0).unwrap();
        let west = GpsPoint::new(-17.0, -179.998);
        assert!(circle.contains(&west));

        let catalog = GeofenceCatalog::new(vec![circle.into()]);
        assert_eq!(catalog.resolve(&west), Some("Dateline"));
    }

    #[test]
    fn test_first_match_wins() {
        let big = GeofenceCircle::new("Big", GpsPoint::new(5.0, 5.0), 50_000.0).unwrap();
        let catalog = GeofenceCatalog::new(vec![square("Square"), big.clone().into()]);
        assert_eq!(catalog.resolve(&GpsPoint::new(5.0, 5.0)), Some("Square"));

        let reversed = GeofenceCatalog::new(vec![big.into(), square("Square")]);
        assert_eq!(reversed.resolve(&GpsPoint::new(5.0, 5.0)), Some("Big"));
    }

    #[test]
    fn test_bbox_hit_but_shape_miss_falls_through() {
        // Triangle occupying the lower-left half of the square; its bbox covers
        // (8, 8) but the shape does not.
        let triangle: Geofence = GeofencePolygon::new(
            "Triangle",
            vec![
                GpsPoint::new(0.0, 0.0),
                GpsPoint::new(10.0, 0.0),
                GpsPoint::new(0.0, 10.0),
            ],
        )
        .unwrap()
        .into();
        let catalog = GeofenceCatalog::new(vec![triangle, square("Square")]);
        assert_eq!(catalog.resolve(&GpsPoint::new(8.0, 8.0)), Some("Square"));
        assert_eq!(catalog.resolve(&GpsPoint::new(1.0, 1.0)), Some("Triangle"));
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = GeofenceCatalog::empty();
        assert!(catalog.is_empty());
        assert_eq!(catalog.resolve(&GpsPoint::new(5.0, 5.0)), None);
    }

    #[test]
    fn test_polygon_validation() {
        let closed = GeofencePolygon::new(
            "Closed",
            vec![
                GpsPoint::new(0.0, 0.0),
                GpsPoint::new(0.0, 1.0),
                GpsPoint::new(1.0, 1.0),
                GpsPoint::new(0.0, 0.0),
            ],
        )
        .unwrap();
        assert_eq!(closed.vertices.len(), 3);

        let err = GeofencePolygon::new(
            "Line",
            vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(1.0, 1.0), GpsPoint::new(0.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidGeofence { .. }));

        assert!(GeofencePolygon::new(
            "Bad",
            vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(91.0, 1.0), GpsPoint::new(1.0, 0.0)],
        )
        .is_err());
    }

    #[test]
    fn test_circle_validation() {
        assert!(GeofenceCircle::new("Zero", GpsPoint::new(0.0, 0.0), 0.0).is_err());
        assert!(GeofenceCircle::new("NaN", GpsPoint::new(0.0, 0.0), f64::NAN).is_err());
        assert!(GeofenceCircle::new("Off", GpsPoint::new(100.0, 0.0), 10.0).is_err());
    }

    #[test]
    fn test_decode_records() {
        let records = vec![
            GeofenceRecord::polygon(
                "Gate 3",
                r#"[{"lat":0,"lng":0},{"lat":0,"lng":10},{"lat":10,"lng":10},{"lat":10,"lng":0}]"#,
            ),
            GeofenceRecord::circle("Camp", r#"{"lat":24.0,"lng":46.0}"#, 500.0),
        ];
        let catalog = GeofenceCatalog::from_records(&records).unwrap();
        assert_eq!(catalog.len(), 2);
        let names: Vec<&str> = catalog.iter().map(Geofence::name).collect();
        assert_eq!(names, vec!["Gate 3", "Camp"]);
        assert_eq!(catalog.resolve(&GpsPoint::new(5.0, 5.0)), Some("Gate 3"));
        assert_eq!(catalog.resolve(&GpsPoint::new(24.0, 46.0)), Some("Camp"));
    }

    #[test]
    fn test_decode_errors() {
        let unknown = GeofenceRecord {
            name: "Route".to_string(),
            kind: "line".to_string(),
            coordinates: None,
            center: None,
            radius: None,
        };
        assert!(matches!(
            Geofence::try_from(&unknown),
            Err(ReportError::InvalidGeofence { .. })
        ));

        let no_radius = GeofenceRecord {
            radius: None,
            ..GeofenceRecord::circle("Camp", r#"{"lat":24.0,"lng":46.0}"#, 1.0)
        };
        assert!(Geofence::try_from(&no_radius).is_err());

        let garbage = GeofenceRecord::polygon("Broken", "not json");
        let err = GeofenceCatalog::from_records(&[garbage]).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }

    #[test]
    fn test_geofence_serializes_tagged() {
        let json = serde_json::to_value(&square("Sq")).unwrap();
        assert_eq!(json["type"], "polygon");
        assert_eq!(json["name"], "Sq");
    }
}
