use crate::auth::auth::{AuthUser, bearer_token};
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();

    let auth_user = match bearer_token(req.request())
        .and_then(|token| AuthUser::from_token(token, &config.jwt_secret))
    {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, path = req.path(), "Rejected unauthenticated request");
            let resp = e.error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
