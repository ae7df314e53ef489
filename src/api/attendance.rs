use crate::auth::auth::AuthUser;
use crate::error::{AppError, ErrorBody};
use crate::model::attendance::{CheckAction, WorkType};
use crate::model::role::Capability;
use crate::service::attendance::{AttendanceService, CheckOutcome, ResolvedLocation};
use crate::service::geofence::{GpsFix, MatchMethod};
use crate::utils::geo::GeoPoint;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coordinates arrive as JSON numbers or as numeric strings from some clients
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum Coordinate {
    Number(f64),
    Text(String),
}

impl Coordinate {
    fn parse(field: &str, value: Option<&Coordinate>) -> Result<f64, AppError> {
        match value {
            None => Err(AppError::Validation(format!("{field} is required"))),
            Some(Coordinate::Number(n)) => Ok(*n),
            Some(Coordinate::Text(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Validation(format!("{field} is not a number: {s}"))),
        }
    }
}

fn fix_from(
    lat: Option<&Coordinate>,
    lng: Option<&Coordinate>,
    accuracy: Option<&Coordinate>,
) -> Result<GpsFix, AppError> {
    GpsFix::new(
        Coordinate::parse("lat", lat)?,
        Coordinate::parse("lng", lng)?,
        Coordinate::parse("accuracy", accuracy)?,
    )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttendanceCheckRequest {
    /// Omit to let the server pick the best assigned location
    #[schema(example = 7)]
    pub location_id: Option<u64>,
    pub action: CheckAction,
    #[schema(value_type = f64, example = 24.7136)]
    pub lat: Option<Coordinate>,
    #[schema(value_type = f64, example = 46.6753)]
    pub lng: Option<Coordinate>,
    /// Reported GPS accuracy in meters
    #[schema(value_type = f64, example = 8.0)]
    pub accuracy: Option<Coordinate>,
    pub work_type: Option<WorkType>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ResolveLocationRequest {
    #[schema(value_type = f64, example = 24.7136)]
    pub lat: Option<Coordinate>,
    #[schema(value_type = f64, example = 46.6753)]
    pub lng: Option<Coordinate>,
    #[schema(value_type = f64, example = 8.0)]
    pub accuracy: Option<Coordinate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceCheckResponse {
    pub action: CheckAction,
    #[schema(example = 311)]
    pub record_id: u64,
    #[schema(example = "Faisal Abdullah Al-Harbi")]
    pub employee_name: String,
    pub location_id: Option<u64>,
    #[schema(example = "Kingdom Centre - Gate 3")]
    pub location_name: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub check_in_time: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_time: Option<DateTime<Utc>>,
    pub distance_m: Option<f64>,
    pub method: Option<MatchMethod>,
}

impl From<CheckOutcome> for AttendanceCheckResponse {
    fn from(o: CheckOutcome) -> Self {
        AttendanceCheckResponse {
            action: o.action,
            record_id: o.record.id,
            employee_name: o.employee_name,
            location_id: o.record.location_id,
            location_name: o.location_name,
            check_in_time: o.record.check_in_time,
            check_out_time: o.record.check_out_time,
            distance_m: o.distance_m.map(round_m),
            method: o.method,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ResolveLocationResponse {
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Kingdom Centre - Gate 3")]
    pub name: String,
    #[schema(example = "Kingdom Holding")]
    pub client_name: String,
    pub center: Option<GeoPoint>,
    #[schema(example = 50)]
    pub radius_m: u32,
    #[schema(example = 12.4)]
    pub distance_m: f64,
    pub method: MatchMethod,
}

impl From<ResolvedLocation> for ResolveLocationResponse {
    fn from(r: ResolvedLocation) -> Self {
        ResolveLocationResponse {
            id: r.location.id,
            center: r.location.display_center(),
            name: r.location.name,
            client_name: r.location.client_name,
            radius_m: r.location.radius_m,
            distance_m: round_m(r.distance_m),
            method: r.method,
        }
    }
}

fn round_m(d: f64) -> f64 {
    (d * 10.0).round() / 10.0
}

/// Check in or check out at a geofenced location
#[utoipa::path(
    post,
    path = "/attendance/check",
    request_body = AttendanceCheckRequest,
    responses(
        (status = 200, description = "Attendance recorded", body = AttendanceCheckResponse),
        (status = 400, description = "Malformed input, GPS too imprecise, or outside the zone", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Location not assigned or no employee profile", body = ErrorBody),
        (status = 404, description = "No open check-in, or unknown location", body = ErrorBody),
        (status = 409, description = "Already checked in", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<AttendanceCheckRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::RecordAttendance)?;
    let employee_id = auth.employee_id()?;
    let body = body.into_inner();
    let fix = fix_from(body.lat.as_ref(), body.lng.as_ref(), body.accuracy.as_ref())?;

    let outcome = match body.action {
        CheckAction::CheckIn => {
            service
                .check_in(
                    employee_id,
                    body.location_id,
                    fix,
                    body.work_type.unwrap_or_default(),
                )
                .await?
        }
        CheckAction::CheckOut => service.check_out(employee_id, body.location_id, fix).await?,
    };

    Ok(HttpResponse::Ok().json(AttendanceCheckResponse::from(outcome)))
}

/// Find which assigned location a position falls in
#[utoipa::path(
    post,
    path = "/attendance/resolve-location",
    request_body = ResolveLocationRequest,
    responses(
        (status = 200, description = "Matching assigned location", body = ResolveLocationResponse),
        (status = 400, description = "Malformed input or GPS too imprecise", body = ErrorBody),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "No assigned location matches", body = ErrorBody)
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn resolve_location(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
    body: web::Json<ResolveLocationRequest>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::RecordAttendance)?;
    let employee_id = auth.employee_id()?;
    let fix = fix_from(body.lat.as_ref(), body.lng.as_ref(), body.accuracy.as_ref())?;

    let resolved = match service.resolve(employee_id, fix).await {
        Ok(r) => r,
        Err(AppError::OutsideGeofence { .. }) => {
            return Err(AppError::NotFound("matching assigned location"));
        }
        Err(e) => return Err(e),
    };

    Ok(HttpResponse::Ok().json(ResolveLocationResponse::from(resolved)))
}
