use actix_web::{HttpResponse, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, ErrorBody};
use crate::model::role::Capability;
use crate::model::uniform::{CreateDelivery, UniformDelivery};
use crate::service::uniform::{RecordedDelivery, UniformService};

#[derive(Serialize, ToSchema)]
pub struct DeliveryLineResponse {
    pub item_id: u64,
    pub quantity: u32,
    pub value: f64,
    pub notes: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DeliveryResponse {
    pub delivery: UniformDelivery,
    pub lines: Vec<DeliveryLineResponse>,
}

impl From<RecordedDelivery> for DeliveryResponse {
    fn from(recorded: RecordedDelivery) -> Self {
        DeliveryResponse {
            delivery: recorded.delivery,
            lines: recorded
                .lines
                .into_iter()
                .map(|l| DeliveryLineResponse {
                    item_id: l.item_id,
                    quantity: l.quantity,
                    value: l.value,
                    notes: l.notes,
                })
                .collect(),
        }
    }
}

/// Record uniform items handed to an employee
#[utoipa::path(
    post,
    path = "/uniforms/deliveries",
    request_body = CreateDelivery,
    responses(
        (status = 201, description = "Delivery recorded", body = DeliveryResponse),
        (status = 400, description = "Empty delivery, bad quantity or unknown item", body = ErrorBody),
        (status = 403, description = "Forbidden", body = ErrorBody),
        (status = 404, description = "Employee not found", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Uniforms"
)]
pub async fn create_delivery(
    auth: AuthUser,
    uniforms: web::Data<UniformService>,
    payload: web::Json<CreateDelivery>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUniforms)?;
    let recorded = uniforms.record(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(DeliveryResponse::from(recorded)))
}

/// Lock a delivery; deduction deliveries are charged to the employee's salary
#[utoipa::path(
    post,
    path = "/uniforms/deliveries/{delivery_id}/finalize",
    params(("delivery_id", Path, description = "Delivery ID")),
    responses(
        (status = 200, description = "Delivery finalized", body = UniformDelivery),
        (status = 404, description = "Delivery not found", body = ErrorBody),
        (status = 409, description = "Delivery already finalized", body = ErrorBody)
    ),
    security(("bearer_auth" = [])),
    tag = "Uniforms"
)]
pub async fn finalize_delivery(
    auth: AuthUser,
    uniforms: web::Data<UniformService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    auth.require(Capability::ManageUniforms)?;
    let delivery = uniforms.finalize(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(delivery))
}
