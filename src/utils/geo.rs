use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Mean Earth radius in meters (WGS84 sphere approximation)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Substitute for a zero vertical span when intersecting a horizontal edge
const EDGE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeoPoint {
    #[schema(example = 24.7136)]
    pub lat: f64,
    #[schema(example = 46.6753)]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Great-circle distance in meters
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let p1 = lat1.to_radians();
    let p2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (d_lambda / 2.0).sin().powi(2);
    // clamp guards against a > 1.0 from rounding on antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Ray-casting containment test. Vertices are (lat, lng); the ray runs
/// along increasing latitude.
pub fn point_in_polygon(point: &GeoPoint, polygon: &[GeoPoint]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (x, y) = (point.lat, point.lng);
    let mut inside = false;

    for (i, a) in polygon.iter().enumerate() {
        let b = &polygon[(i + 1) % polygon.len()];
        let (x1, y1) = (a.lat, a.lng);
        let (x2, y2) = (b.lat, b.lng);

        if (y1 > y) != (y2 > y) {
            let mut span = y2 - y1;
            if span == 0.0 {
                span = EDGE_EPSILON;
            }
            let x_intersect = (x2 - x1) * (y - y1) / span + x1;
            if x_intersect > x {
                inside = !inside;
            }
        }
    }

    inside
}

/// Arithmetic mean of the vertices, used as a display center for polygon-only zones
pub fn centroid(points: &[GeoPoint]) -> Option<GeoPoint> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (lat, lng) = points
        .iter()
        .fold((0.0, 0.0), |(la, ln), p| (la + p.lat, ln + p.lng));
    Some(GeoPoint::new(lat / n, lng / n))
}

/// Parses a plain `lat,lng` pair
pub fn parse_latlng(s: &str) -> Option<GeoPoint> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return None;
    }
    let lat = parts[0].parse::<f64>().ok()?;
    let lng = parts[1].parse::<f64>().ok()?;
    Some(GeoPoint::new(lat, lng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn square() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(24.0, 46.0),
            GeoPoint::new(24.0, 47.0),
            GeoPoint::new(25.0, 47.0),
            GeoPoint::new(25.0, 46.0),
        ]
    }

    #[test]
    fn point_inside_square() {
        assert!(point_in_polygon(&GeoPoint::new(24.5, 46.5), &square()));
    }

    #[test]
    fn point_outside_square() {
        assert!(!point_in_polygon(&GeoPoint::new(25.5, 46.5), &square()));
        assert!(!point_in_polygon(&GeoPoint::new(24.5, 45.9), &square()));
    }

    #[test]
    fn degenerate_polygon_never_contains() {
        let line = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!point_in_polygon(&GeoPoint::new(0.5, 0.5), &line));
        assert!(!point_in_polygon(&GeoPoint::new(0.0, 0.0), &[]));
    }

    #[test]
    fn concave_polygon_notch_is_outside() {
        // U shape opening towards higher latitude
        let u = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(3.0, 2.0),
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(3.0, 1.0),
            GeoPoint::new(3.0, 0.0),
        ];
        assert!(!point_in_polygon(&GeoPoint::new(2.0, 1.5), &u));
        assert!(point_in_polygon(&GeoPoint::new(0.5, 1.5), &u));
        assert!(point_in_polygon(&GeoPoint::new(2.0, 0.5), &u));
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.93).abs() < 1.0, "got {d}");
    }

    #[test]
    fn parse_plain_pair() {
        assert_eq!(parse_latlng(" 24.7, 46.6 "), Some(GeoPoint::new(24.7, 46.6)));
        assert_eq!(parse_latlng("24.7"), None);
        assert_eq!(parse_latlng("a,b"), None);
        assert_eq!(parse_latlng(""), None);
    }

    #[test]
    fn centroid_of_square() {
        assert_eq!(centroid(&square()), Some(GeoPoint::new(24.5, 46.5)));
        assert_eq!(centroid(&[]), None);
    }

    proptest! {
        #[test]
        fn distance_to_self_is_zero(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            prop_assert_eq!(haversine_distance(lat, lng, lat, lng), 0.0);
        }

        #[test]
        fn distance_is_symmetric(
            lat1 in -90.0f64..90.0, lng1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lng2 in -180.0f64..180.0,
        ) {
            let ab = haversine_distance(lat1, lng1, lat2, lng2);
            let ba = haversine_distance(lat2, lng2, lat1, lng1);
            prop_assert!(ab >= 0.0);
            prop_assert!((ab - ba).abs() < 1e-6);
        }

        #[test]
        fn strictly_inside_square_is_contained(lat in 24.01f64..24.99, lng in 46.01f64..46.99) {
            prop_assert!(point_in_polygon(&GeoPoint::new(lat, lng), &square()));
        }

        #[test]
        fn north_of_square_is_outside(lat in 25.01f64..30.0, lng in 40.0f64..50.0) {
            prop_assert!(!point_in_polygon(&GeoPoint::new(lat, lng), &square()));
        }
    }
}
