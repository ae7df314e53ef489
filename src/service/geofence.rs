use serde::Serialize;
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::location::Location;
use crate::utils::geo::{GeoPoint, point_in_polygon};

/// How a point was matched to a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchMethod {
    Polygon,
    Radius,
}

/// A position report from the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub point: GeoPoint,
    /// Reported horizontal accuracy in meters
    pub accuracy_m: f64,
}

impl GpsFix {
    pub fn new(lat: f64, lng: f64, accuracy_m: f64) -> Result<Self, AppError> {
        let point = GeoPoint::new(lat, lng);
        if !point.is_valid() {
            return Err(AppError::Validation(format!("Coordinates out of range: {lat},{lng}")));
        }
        if !accuracy_m.is_finite() || accuracy_m < 0.0 {
            return Err(AppError::Validation("accuracy must be a non-negative number".into()));
        }
        Ok(Self { point, accuracy_m })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationMatch<'a> {
    pub location: &'a Location,
    pub distance_m: f64,
    pub method: MatchMethod,
}

/// Boundary evaluation of one fix against one location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub accuracy_ok: bool,
    pub method: Option<MatchMethod>,
    /// Distance to the circular center when one is configured, 0 on a polygon hit
    pub distance_m: Option<f64>,
}

pub fn evaluate(location: &Location, fix: &GpsFix) -> Evaluation {
    let accuracy_ok = fix.accuracy_m <= f64::from(location.radius_m);

    if let Some(polygon) = location.active_polygon() {
        if point_in_polygon(&fix.point, polygon) {
            return Evaluation {
                accuracy_ok,
                method: Some(MatchMethod::Polygon),
                distance_m: Some(0.0),
            };
        }
    }

    let distance_m = location.center.map(|c| c.distance_to(&fix.point));
    let method = match distance_m {
        Some(d) if d <= f64::from(location.radius_m) => Some(MatchMethod::Radius),
        _ => None,
    };

    Evaluation {
        accuracy_ok,
        method,
        distance_m,
    }
}

/// Strict check against a single, caller-chosen location. Accuracy is
/// rejected before the boundary result is considered.
pub fn check_location<'a>(location: &'a Location, fix: &GpsFix) -> Result<LocationMatch<'a>, AppError> {
    let eval = evaluate(location, fix);
    if !eval.accuracy_ok {
        return Err(AppError::InsufficientAccuracy {
            accuracy: fix.accuracy_m,
            allowed: location.radius_m,
        });
    }
    match eval.method {
        Some(method) => Ok(LocationMatch {
            location,
            distance_m: eval.distance_m.unwrap_or(0.0),
            method,
        }),
        None => Err(AppError::OutsideGeofence {
            distance_m: eval.distance_m,
        }),
    }
}

/// Picks the best of the employee's assigned locations for a fix.
///
/// The first polygon hit wins outright; otherwise the closest radius hit.
/// Candidates whose radius is smaller than the reported accuracy are
/// skipped, and if nothing matched because of that the result is
/// `InsufficientAccuracy` rather than a boundary error.
pub fn resolve_location_for_point<'a>(
    assigned: &'a [Location],
    fix: &GpsFix,
) -> Result<LocationMatch<'a>, AppError> {
    let mut best: Option<LocationMatch<'a>> = None;
    let mut nearest_miss: Option<f64> = None;
    let mut accuracy_limit: Option<u32> = None;

    for location in assigned {
        let eval = evaluate(location, fix);
        if !eval.accuracy_ok {
            accuracy_limit = Some(accuracy_limit.map_or(location.radius_m, |a| a.max(location.radius_m)));
            continue;
        }

        match eval.method {
            Some(MatchMethod::Polygon) => {
                return Ok(LocationMatch {
                    location,
                    distance_m: 0.0,
                    method: MatchMethod::Polygon,
                });
            }
            Some(MatchMethod::Radius) => {
                let distance_m = eval.distance_m.unwrap_or(0.0);
                if best.is_none_or(|b| distance_m < b.distance_m) {
                    best = Some(LocationMatch {
                        location,
                        distance_m,
                        method: MatchMethod::Radius,
                    });
                }
            }
            None => {
                if let Some(d) = eval.distance_m {
                    nearest_miss = Some(nearest_miss.map_or(d, |n| n.min(d)));
                }
            }
        }
    }

    if let Some(found) = best {
        return Ok(found);
    }
    if let Some(allowed) = accuracy_limit {
        return Err(AppError::InsufficientAccuracy {
            accuracy: fix.accuracy_m,
            allowed,
        });
    }
    Err(AppError::OutsideGeofence {
        distance_m: nearest_miss,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Meters per degree of latitude on the haversine sphere
    pub const M_PER_DEG_LAT: f64 = 111_194.926_644_558_73;

    pub const CENTER: GeoPoint = GeoPoint { lat: 24.7136, lng: 46.6753 };

    pub fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(p.lat + meters / M_PER_DEG_LAT, p.lng)
    }

    pub fn circle(id: u64, center: GeoPoint, radius_m: u32) -> Location {
        Location {
            id,
            name: format!("Circle {id}"),
            client_name: "Client".into(),
            center: Some(center),
            radius_m,
            use_polygon: false,
            polygon: Vec::new(),
            instructions: None,
        }
    }

    /// Square polygon of `half_side_deg` around `center`, without a circular center
    pub fn square(id: u64, center: GeoPoint, half_side_deg: f64) -> Location {
        let h = half_side_deg;
        Location {
            id,
            name: format!("Polygon {id}"),
            client_name: "Client".into(),
            center: None,
            radius_m: 50,
            use_polygon: true,
            polygon: vec![
                GeoPoint::new(center.lat - h, center.lng - h),
                GeoPoint::new(center.lat - h, center.lng + h),
                GeoPoint::new(center.lat + h, center.lng + h),
                GeoPoint::new(center.lat + h, center.lng - h),
            ],
            instructions: None,
        }
    }

    fn fix(p: GeoPoint, accuracy: f64) -> GpsFix {
        GpsFix::new(p.lat, p.lng, accuracy).unwrap()
    }

    #[test]
    fn polygon_hit_beats_radius_hit() {
        let a = circle(1, CENTER, 50);
        let b = square(2, CENTER, 0.001);
        let assigned = vec![a, b];

        let m = resolve_location_for_point(&assigned, &fix(north_of(CENTER, 5.0), 10.0)).unwrap();
        assert_eq!(m.location.id, 2);
        assert_eq!(m.method, MatchMethod::Polygon);
        assert_eq!(m.distance_m, 0.0);
    }

    #[test]
    fn sixty_meters_out_of_fifty_is_a_boundary_error() {
        let assigned = vec![circle(1, CENTER, 50)];
        let err = resolve_location_for_point(&assigned, &fix(north_of(CENTER, 60.0), 10.0)).unwrap_err();
        match err {
            AppError::OutsideGeofence { distance_m: Some(d) } => assert!((d - 60.0).abs() < 0.5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn imprecise_fix_is_rejected_even_when_close() {
        let assigned = vec![circle(1, CENTER, 50)];
        let err = resolve_location_for_point(&assigned, &fix(north_of(CENTER, 10.0), 80.0)).unwrap_err();
        assert!(matches!(err, AppError::InsufficientAccuracy { allowed: 50, .. }));

        let err = check_location(&assigned[0], &fix(north_of(CENTER, 10.0), 80.0)).unwrap_err();
        assert!(matches!(err, AppError::InsufficientAccuracy { allowed: 50, .. }));
    }

    #[test]
    fn closest_radius_match_wins() {
        let far = circle(1, north_of(CENTER, 40.0), 100);
        let near = circle(2, north_of(CENTER, 15.0), 100);
        let assigned = vec![far, near];

        let m = resolve_location_for_point(&assigned, &fix(CENTER, 5.0)).unwrap();
        assert_eq!(m.location.id, 2);
        assert_eq!(m.method, MatchMethod::Radius);
        assert!((m.distance_m - 15.0).abs() < 0.5);
    }

    #[test]
    fn polygon_mode_falls_back_to_radius() {
        let mut loc = square(1, north_of(CENTER, 500.0), 0.0001);
        loc.center = Some(CENTER);
        let m = check_location(&loc, &fix(north_of(CENTER, 20.0), 5.0)).unwrap();
        assert_eq!(m.method, MatchMethod::Radius);
    }

    #[test]
    fn no_assigned_locations_is_outside() {
        let err = resolve_location_for_point(&[], &fix(CENTER, 5.0)).unwrap_err();
        assert!(matches!(err, AppError::OutsideGeofence { distance_m: None }));
    }

    #[test]
    fn invalid_fix_is_a_validation_error() {
        assert!(matches!(GpsFix::new(91.0, 0.0, 5.0), Err(AppError::Validation(_))));
        assert!(matches!(GpsFix::new(0.0, 0.0, -1.0), Err(AppError::Validation(_))));
        assert!(matches!(GpsFix::new(f64::NAN, 0.0, 5.0), Err(AppError::Validation(_))));
    }

    #[test]
    fn method_names() {
        assert_eq!(MatchMethod::Polygon.to_string(), "polygon");
        assert_eq!(MatchMethod::Radius.to_string(), "radius");
    }
}
