use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, ErrorBody};
use crate::model::attendance::AttendanceRecord;
use crate::model::employee::Employee;
use crate::model::location::Location;
use crate::model::role::Capability;
use crate::service::attendance::AttendanceService;

#[derive(Serialize, ToSchema)]
pub struct GuardOverview {
    pub profile: Employee,
    /// Sites the guard may check in at
    pub locations: Vec<Location>,
    pub open_record: Option<AttendanceRecord>,
}

/// Own profile, assigned locations and current check-in
#[utoipa::path(
    get,
    path = "/guard/me",
    responses(
        (status = 200, body = GuardOverview),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "No employee profile linked", body = ErrorBody),
        (status = 404, description = "Employee profile missing", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Guard"
)]
pub async fn me(
    auth: AuthUser,
    service: web::Data<AttendanceService>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ViewOwnProfile)?;
    let employee_id = auth.employee_id()?;

    let profile = service
        .profile(employee_id)
        .await?
        .ok_or(AppError::NotFound("employee profile"))?;
    let locations = service.assigned_locations(employee_id).await?;
    let open_record = service.open_record(employee_id).await?;

    Ok(HttpResponse::Ok().json(GuardOverview {
        profile,
        locations,
        open_record,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::token_for;
    use crate::config::Config;
    use crate::models::TokenType;
    use crate::service::attendance::CheckPolicy;
    use crate::service::attendance::tests::{service_over, store};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn lists_only_assigned_locations() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(service_over(store(), CheckPolicy::default())))
                .route("/guard/me", web::get().to(me)),
        )
        .await;

        let token = token_for(3, Some(1), TokenType::Access, "test-secret");
        let req = test::TestRequest::get()
            .uri("/guard/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["profile"]["full_name"], "Faisal Al-Harbi");
        let ids: Vec<u64> = body["locations"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![10, 20]);
        assert!(body["open_record"].is_null());
    }

    #[actix_web::test]
    async fn account_without_employee_is_forbidden() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::new(service_over(store(), CheckPolicy::default())))
                .route("/guard/me", web::get().to(me)),
        )
        .await;

        let token = token_for(3, None, TokenType::Access, "test-secret");
        let req = test::TestRequest::get()
            .uri("/guard/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
