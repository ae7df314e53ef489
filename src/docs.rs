use crate::api::attendance::{
    AttendanceCheckRequest, AttendanceCheckResponse, Coordinate, ResolveLocationRequest,
    ResolveLocationResponse,
};
use crate::api::guard::GuardOverview;
use crate::api::location::{AssignEmployee, LocationListResponse, LocationQuery};
use crate::api::payroll::SalaryResponse;
use crate::api::uniform::{DeliveryLineResponse, DeliveryResponse};
use crate::error::ErrorBody;
use crate::model::attendance::{AttendanceRecord, CheckAction, WorkType};
use crate::model::employee::Employee;
use crate::model::location::{Location, LocationDraft};
use crate::model::salary::{Salary, UpdateSalary};
use crate::model::uniform::{CreateDelivery, DeliveryLine, PaymentMethod, UniformDelivery};
use crate::service::geofence::MatchMethod;
use crate::utils::geo::GeoPoint;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Guard Attendance API",
        version = "1.0.0",
        description = r#"
## Geofenced attendance for security guards

Guards check in and out from their phones. Every check is validated against
the guard's **assigned** locations: a circular zone around a center point, or
a polygon boundary when one is configured.

### Key Features
- **Attendance**
  - Check in / check out with GPS position and accuracy
  - Resolve which assigned site the guard is standing in
- **Locations**
  - Manage sites, radii and polygons; accept Google Maps links as coordinates
  - Assign and unassign guards
- **Uniforms & Payroll**
  - Record uniform deliveries; finalized deduction deliveries are charged to salary

### Security
All endpoints require a **JWT Bearer** access token.

### Errors
Every error response is `{"error": "<code>", "message": "<text>"}`.
"#,
    ),
    paths(
        crate::api::attendance::check,
        crate::api::attendance::resolve_location,

        crate::api::guard::me,

        crate::api::location::create_location,
        crate::api::location::list_locations,
        crate::api::location::get_location,
        crate::api::location::update_location,
        crate::api::location::assign_employee,
        crate::api::location::unassign_employee,

        crate::api::uniform::create_delivery,
        crate::api::uniform::finalize_delivery,

        crate::api::payroll::get_salary,
        crate::api::payroll::update_salary
    ),
    components(
        schemas(
            AttendanceCheckRequest,
            AttendanceCheckResponse,
            ResolveLocationRequest,
            ResolveLocationResponse,
            Coordinate,
            CheckAction,
            WorkType,
            MatchMethod,
            AttendanceRecord,
            GeoPoint,
            GuardOverview,
            Employee,
            Location,
            LocationDraft,
            LocationQuery,
            LocationListResponse,
            AssignEmployee,
            CreateDelivery,
            DeliveryLine,
            DeliveryResponse,
            DeliveryLineResponse,
            UniformDelivery,
            PaymentMethod,
            Salary,
            UpdateSalary,
            SalaryResponse,
            ErrorBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Geofenced check-in and check-out"),
        (name = "Guard", description = "Guard self-service"),
        (name = "Locations", description = "Site and assignment management"),
        (name = "Uniforms", description = "Uniform deliveries"),
        (name = "Payroll", description = "Salary records"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Paths are relative to the scope the routes are mounted on; the configured
/// `API_PREFIX` becomes the document's server URL.
pub fn openapi_for(api_prefix: &str) -> openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(api_prefix)]);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_attendance_paths_and_bearer_scheme() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/attendance/check"));
        assert!(doc.paths.paths.contains_key("/locations/{location_id}/assignments"));
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }

    #[test]
    fn server_url_follows_the_configured_prefix() {
        let doc = openapi_for("/guard-api/v2");
        let servers = doc.servers.expect("servers");
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].url, "/guard-api/v2");
        assert!(doc.paths.paths.keys().all(|p| !p.starts_with("/api/")));
    }
}
