use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use sqlx::types::Json;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::{AppError, ErrorBody};
use crate::model::location::{Location, LocationDraft, LocationRow, ValidLocation};
use crate::model::role::Capability;
use crate::repo::mysql::LOCATION_COLUMNS;
use crate::repo::{EmployeeRepository, LocationRepository};

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LocationQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Matches location or client name
    #[schema(example = "Kingdom")]
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LocationListResponse {
    pub data: Vec<Location>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignEmployee {
    #[schema(example = 12)]
    pub employee_id: u64,
}

async fn fetch_location(pool: &MySqlPool, location_id: u64) -> Result<Location, AppError> {
    let sql = format!("SELECT {LOCATION_COLUMNS} FROM locations l WHERE l.id = ?");
    sqlx::query_as::<_, LocationRow>(&sql)
        .bind(location_id)
        .fetch_optional(pool)
        .await?
        .map(Location::from)
        .ok_or(AppError::NotFound("location"))
}

fn bind_location<'q>(
    query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
    v: &'q ValidLocation,
) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    query
        .bind(&v.name)
        .bind(&v.client_name)
        .bind(&v.gps_coordinates)
        .bind(v.gps_radius)
        .bind(v.use_polygon)
        .bind(v.polygon_coords.as_ref().map(Json))
        .bind(&v.instructions)
}

/// Create a location
#[utoipa::path(
    post,
    path = "/locations",
    request_body = LocationDraft,
    responses(
        (status = 201, description = "Location created", body = Location),
        (status = 400, description = "Invalid coordinates or polygon", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn create_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<LocationDraft>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;
    let valid = payload.into_inner().validate()?;

    let query = sqlx::query(
        r#"
        INSERT INTO locations
        (name, client_name, gps_coordinates, gps_radius, use_polygon, polygon_coords, instructions)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    );
    let done = bind_location(query, &valid).execute(pool.get_ref()).await?;
    let location_id = done.last_insert_id();

    info!(location_id, name = %valid.name, by = auth.user_id, "Location created");
    let location = fetch_location(pool.get_ref(), location_id).await?;
    Ok(HttpResponse::Created().json(location))
}

/// List locations
#[utoipa::path(
    get,
    path = "/locations",
    params(LocationQuery),
    responses(
        (status = 200, description = "Paginated location list", body = LocationListResponse),
        (status = 403, description = "Forbidden", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn list_locations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LocationQuery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let like = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{s}%"));
    let where_clause = if like.is_some() {
        "WHERE (l.name LIKE ? OR l.client_name LIKE ?)"
    } else {
        ""
    };

    let count_sql = format!("SELECT COUNT(*) FROM locations l {where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(like) = &like {
        count_query = count_query.bind(like).bind(like);
    }
    let total = count_query.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "SELECT {LOCATION_COLUMNS} FROM locations l {where_clause} ORDER BY l.id DESC LIMIT ? OFFSET ?"
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching locations");
    let mut data_query = sqlx::query_as::<_, LocationRow>(&data_sql);
    if let Some(like) = &like {
        data_query = data_query.bind(like).bind(like);
    }
    let rows = data_query
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(LocationListResponse {
        data: rows.into_iter().map(Location::from).collect(),
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/locations/{location_id}",
    params(("location_id", Path, description = "Location ID")),
    responses(
        (status = 200, body = Location),
        (status = 404, description = "Location not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn get_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;
    let location = fetch_location(pool.get_ref(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(location))
}

/// Replace a location's fields
#[utoipa::path(
    put,
    path = "/locations/{location_id}",
    params(("location_id", Path, description = "Location ID")),
    request_body = LocationDraft,
    responses(
        (status = 200, description = "Location updated", body = Location),
        (status = 400, description = "Invalid coordinates or polygon", body = ErrorBody),
        (status = 404, description = "Location not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn update_location(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<LocationDraft>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;
    let location_id = path.into_inner();
    let valid = payload.into_inner().validate()?;

    // existence first: MySQL reports 0 affected rows for unchanged values too
    fetch_location(pool.get_ref(), location_id).await?;

    let query = sqlx::query(
        r#"
        UPDATE locations
        SET name = ?, client_name = ?, gps_coordinates = ?, gps_radius = ?,
            use_polygon = ?, polygon_coords = ?, instructions = ?
        WHERE id = ?
        "#,
    );
    bind_location(query, &valid)
        .bind(location_id)
        .execute(pool.get_ref())
        .await?;

    info!(location_id, by = auth.user_id, "Location updated");
    let location = fetch_location(pool.get_ref(), location_id).await?;
    Ok(HttpResponse::Ok().json(location))
}

/// Clear an employee for a location
#[utoipa::path(
    post,
    path = "/locations/{location_id}/assignments",
    params(("location_id", Path, description = "Location ID")),
    request_body = AssignEmployee,
    responses(
        (status = 201, description = "Employee assigned"),
        (status = 404, description = "Location or employee not found", body = ErrorBody),
        (status = 409, description = "Already assigned", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn assign_employee(
    auth: AuthUser,
    locations: web::Data<dyn LocationRepository>,
    employees: web::Data<dyn EmployeeRepository>,
    path: web::Path<u64>,
    body: web::Json<AssignEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;
    let location_id = path.into_inner();
    let employee_id = body.employee_id;

    if locations.find(location_id).await?.is_none() {
        return Err(AppError::NotFound("location"));
    }
    if employees.profile(employee_id).await?.is_none() {
        return Err(AppError::NotFound("employee"));
    }

    locations.assign(employee_id, location_id).await?;
    info!(location_id, employee_id, by = auth.user_id, "Employee assigned to location");
    Ok(HttpResponse::Created().json(json!({
        "message": "Employee assigned to location"
    })))
}

/// Remove an employee's clearance for a location
#[utoipa::path(
    delete,
    path = "/locations/{location_id}/assignments/{employee_id}",
    params(
        ("location_id", Path, description = "Location ID"),
        ("employee_id", Path, description = "Employee ID")
    ),
    responses(
        (status = 204, description = "Assignment removed"),
        (status = 404, description = "Assignment not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Locations"
)]
pub async fn unassign_employee(
    auth: AuthUser,
    locations: web::Data<dyn LocationRepository>,
    path: web::Path<(u64, u64)>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageLocations)?;
    let (location_id, employee_id) = path.into_inner();

    locations.unassign(employee_id, location_id).await?;
    info!(location_id, employee_id, by = auth.user_id, "Employee unassigned from location");
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::token_for;
    use crate::config::Config;
    use crate::models::TokenType;
    use crate::service::attendance::tests::store;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use std::sync::Arc;

    const OPS_MANAGER: u8 = 5;

    fn bearer() -> (&'static str, String) {
        let token = token_for(OPS_MANAGER, None, TokenType::Access, "test-secret");
        ("Authorization", format!("Bearer {token}"))
    }

    #[actix_web::test]
    async fn assignments_conflict_and_missing_pairs() {
        let store = store();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(Config::for_tests()))
                .app_data(web::Data::from(store.clone() as Arc<dyn LocationRepository>))
                .app_data(web::Data::from(store.clone() as Arc<dyn EmployeeRepository>))
                .app_data(crate::routes::json_config())
                .route("/locations/{id}/assignments", web::post().to(assign_employee))
                .route(
                    "/locations/{id}/assignments/{employee_id}",
                    web::delete().to(unassign_employee),
                ),
        )
        .await;

        let assign = |location: u64, employee: u64| {
            test::TestRequest::post()
                .uri(&format!("/locations/{location}/assignments"))
                .insert_header(bearer())
                .set_json(serde_json::json!({ "employee_id": employee }))
                .to_request()
        };

        let resp = test::call_service(&app, assign(30, 1)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(store.is_assigned(1, 30));

        let resp = test::call_service(&app, assign(30, 1)).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = test::call_service(&app, assign(999, 1)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = test::call_service(&app, assign(30, 42)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let unassign = |location: u64, employee: u64| {
            test::TestRequest::delete()
                .uri(&format!("/locations/{location}/assignments/{employee}"))
                .insert_header(bearer())
                .to_request()
        };
        let resp = test::call_service(&app, unassign(30, 1)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!store.is_assigned(1, 30));

        let resp = test::call_service(&app, unassign(30, 1)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
