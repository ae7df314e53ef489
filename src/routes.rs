use crate::{
    api::{attendance, guard, location, payroll, uniform},
    auth::middleware::auth_middleware,
    config::Config,
    error::AppError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use anyhow::{Context, Result};
use std::sync::Arc;

type Limiter = Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>;

fn build_limiter(requests_per_min: u32) -> Result<Limiter> {
    let per_ms = if requests_per_min == 0 {
        1
    } else {
        60_000 / requests_per_min as u64
    };
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms.max(1))
        .burst_size(requests_per_min.max(1))
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .with_context(|| format!("invalid rate limit: {requests_per_min}/min"))?;
    Ok(Arc::new(Governor::new(&cfg)))
}

/// Rate limiters shared by every worker
#[derive(Clone)]
pub struct Limiters {
    attendance: Limiter,
    protected: Limiter,
}

impl Limiters {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            attendance: build_limiter(config.rate_attendance_per_min)?,
            protected: build_limiter(config.rate_protected_per_min)?,
        })
    }
}

/// Body parse failures answer with the same JSON error shape as handlers
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::Validation(format!("Invalid request body: {err}")).into())
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    cfg.app_data(json_config());

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .service(
                web::scope("/attendance")
                    .wrap(limiters.attendance.clone())
                    // /attendance/check
                    .service(web::resource("/check").route(web::post().to(attendance::check)))
                    // /attendance/resolve-location
                    .service(
                        web::resource("/resolve-location")
                            .route(web::post().to(attendance::resolve_location)),
                    ),
            )
            .service(
                web::scope("/guard")
                    .service(web::resource("/me").route(web::get().to(guard::me))),
            )
            .service(
                web::scope("/locations")
                    // /locations
                    .service(
                        web::resource("")
                            .route(web::post().to(location::create_location))
                            .route(web::get().to(location::list_locations)),
                    )
                    // /locations/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(location::get_location))
                            .route(web::put().to(location::update_location)),
                    )
                    // /locations/{id}/assignments
                    .service(
                        web::resource("/{id}/assignments")
                            .route(web::post().to(location::assign_employee)),
                    )
                    // /locations/{id}/assignments/{employee_id}
                    .service(
                        web::resource("/{id}/assignments/{employee_id}")
                            .route(web::delete().to(location::unassign_employee)),
                    ),
            )
            .service(
                web::scope("/uniforms")
                    .service(
                        web::resource("/deliveries").route(web::post().to(uniform::create_delivery)),
                    )
                    .service(
                        web::resource("/deliveries/{id}/finalize")
                            .route(web::post().to(uniform::finalize_delivery)),
                    ),
            )
            .service(
                web::scope("/payroll").service(
                    web::resource("/salary/{employee_id}")
                        .route(web::get().to(payroll::get_salary))
                        .route(web::put().to(payroll::update_salary)),
                ),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::token_for;
    use crate::models::TokenType;
    use crate::service::attendance::CheckPolicy;
    use crate::service::attendance::tests::{service_over, store};
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::json;

    #[actix_web::test]
    async fn protected_scope_rejects_refresh_tokens() {
        let config = Config::for_tests();
        let limiters = Limiters::from_config(&config).unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(config.clone()))
                .app_data(web::Data::new(service_over(store(), CheckPolicy::default())))
                .configure(|cfg| configure(cfg, &config, &limiters)),
        )
        .await;

        let refresh = token_for(3, Some(1), TokenType::Refresh, "test-secret");
        let req = test::TestRequest::get()
            .uri("/api/guard/me")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {refresh}")))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let access = token_for(3, Some(1), TokenType::Access, "test-secret");
        let req = test::TestRequest::post()
            .uri("/api/attendance/check")
            .peer_addr("10.0.0.1:4000".parse().unwrap())
            .insert_header(("Authorization", format!("Bearer {access}")))
            .set_json(json!({"action": "check_in", "lat": "x", "lng": 46.6, "accuracy": 5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
