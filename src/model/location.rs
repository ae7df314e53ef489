use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::utils::geo::{GeoPoint, centroid, parse_latlng};
use crate::utils::maps::parse_maps_link;

pub const DEFAULT_GPS_RADIUS_M: u32 = 50;

/// Site a guard can be cleared to work at
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Location {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Kingdom Centre - Gate 3")]
    pub name: String,
    #[schema(example = "Kingdom Holding")]
    pub client_name: String,
    pub center: Option<GeoPoint>,
    #[schema(example = 50)]
    pub radius_m: u32,
    pub use_polygon: bool,
    pub polygon: Vec<GeoPoint>,
    pub instructions: Option<String>,
}

impl Location {
    /// Polygon boundary when polygon mode is active and well-formed
    pub fn active_polygon(&self) -> Option<&[GeoPoint]> {
        if self.use_polygon && self.polygon.len() >= 3 {
            Some(&self.polygon)
        } else {
            None
        }
    }

    /// Center shown to clients: configured center, else the polygon centroid
    pub fn display_center(&self) -> Option<GeoPoint> {
        self.center.or_else(|| centroid(&self.polygon))
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct LocationRow {
    pub id: u64,
    pub name: String,
    pub client_name: String,
    pub gps_coordinates: Option<String>,
    pub gps_radius: u32,
    pub use_polygon: bool,
    pub polygon_coords: Option<Json<Vec<[f64; 2]>>>,
    pub instructions: Option<String>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        let polygon = row
            .polygon_coords
            .map(|Json(points)| points.into_iter().map(|[lat, lng]| GeoPoint::new(lat, lng)).collect())
            .unwrap_or_default();

        Location {
            id: row.id,
            name: row.name,
            client_name: row.client_name,
            center: row.gps_coordinates.as_deref().and_then(parse_latlng),
            radius_m: row.gps_radius,
            use_polygon: row.use_polygon,
            polygon,
            instructions: row.instructions,
        }
    }
}

/// Create/replace payload for a location
#[derive(Debug, Deserialize, ToSchema)]
pub struct LocationDraft {
    #[schema(example = "Kingdom Centre - Gate 3")]
    pub name: String,
    #[schema(example = "Kingdom Holding")]
    pub client_name: String,
    /// `lat,lng` or a Google Maps link
    #[schema(example = "https://maps.google.com/?q=24.7113,46.6744")]
    pub gps_coordinates: Option<String>,
    #[schema(example = 50)]
    pub gps_radius: Option<u32>,
    #[serde(default)]
    pub use_polygon: bool,
    /// Vertices as `[lat, lng]` pairs
    #[schema(value_type = Option<Vec<Vec<f64>>>, example = json!([[24.0, 46.0], [24.0, 47.0], [25.0, 47.0]]))]
    pub polygon: Option<Vec<[f64; 2]>>,
    /// One `lat,lng` vertex per line; used when `polygon` is absent
    pub polygon_text: Option<String>,
    pub instructions: Option<String>,
}

/// Columns ready to be written
#[derive(Debug, PartialEq)]
pub struct ValidLocation {
    pub name: String,
    pub client_name: String,
    pub gps_coordinates: Option<String>,
    pub gps_radius: u32,
    pub use_polygon: bool,
    pub polygon_coords: Option<Vec<[f64; 2]>>,
    pub instructions: Option<String>,
}

impl LocationDraft {
    pub fn validate(self) -> Result<ValidLocation, AppError> {
        let name = self.name.trim().to_string();
        let client_name = self.client_name.trim().to_string();
        if name.is_empty() || client_name.is_empty() {
            return Err(AppError::Validation("name and client_name are required".into()));
        }

        let gps_radius = self.gps_radius.unwrap_or(DEFAULT_GPS_RADIUS_M);
        if gps_radius == 0 {
            return Err(AppError::Validation("gps_radius must be greater than zero".into()));
        }

        let gps_coordinates = match self.gps_coordinates.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(normalize_coordinates(raw)?),
        };

        let polygon_coords = if self.use_polygon {
            let points = match (self.polygon, self.polygon_text.as_deref()) {
                (Some(points), _) => points,
                (None, Some(text)) => parse_polygon_text(text)?,
                (None, None) => {
                    return Err(AppError::Validation(
                        "Polygon mode is enabled but no vertices were given".into(),
                    ));
                }
            };
            for [lat, lng] in &points {
                if !GeoPoint::new(*lat, *lng).is_valid() {
                    return Err(AppError::Validation(format!(
                        "Polygon vertex out of range: {lat},{lng}"
                    )));
                }
            }
            if points.len() < 3 {
                return Err(AppError::Validation("Polygon needs at least 3 points".into()));
            }
            Some(points)
        } else {
            None
        };

        if gps_coordinates.is_none() && polygon_coords.is_none() {
            return Err(AppError::Validation(
                "Either gps_coordinates or a polygon is required".into(),
            ));
        }

        Ok(ValidLocation {
            name,
            client_name,
            gps_coordinates,
            gps_radius,
            use_polygon: self.use_polygon,
            polygon_coords,
            instructions: self.instructions.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Accepts `lat,lng` or a maps link and returns `lat,lng` with 5 decimals
fn normalize_coordinates(raw: &str) -> Result<String, AppError> {
    let point = match parse_latlng(raw) {
        Some(p) if p.is_valid() => p,
        Some(_) => return Err(AppError::Validation("lat/lng out of range".into())),
        None => parse_maps_link(raw).map_err(|_| {
            AppError::Validation("Enter lat,lng or a valid Google Maps link".into())
        })?,
    };
    Ok(format!("{:.5},{:.5}", point.lat, point.lng))
}

fn parse_polygon_text(text: &str) -> Result<Vec<[f64; 2]>, AppError> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            parse_latlng(line)
                .map(|p| [p.lat, p.lng])
                .ok_or_else(|| AppError::Validation(format!("Invalid polygon line: {line}")))
        })
        .collect()
}
