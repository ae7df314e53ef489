use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use std::sync::Arc;
use std::time::Duration;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod events;
mod model;
mod models;
mod repo;
mod routes;
mod service;
mod utils;

use config::Config;
use db::init_db;

use crate::events::EventBus;
use crate::repo::{EmployeeRepository, LocationRepository, MySqlStore, SalaryLedger};
use crate::routes::Limiters;
use crate::service::attendance::{AttendanceService, CheckPolicy};
use crate::service::locks::EmployeeLocks;
use crate::service::payroll::PayrollService;
use crate::service::uniform::UniformService;
use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store = Arc::new(MySqlStore::new(pool.clone()));

    let attendance = Data::new(AttendanceService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        EmployeeLocks::new(Duration::from_secs(config.check_lock_idle_secs)),
        CheckPolicy {
            checkout_requires_geofence: config.checkout_requires_geofence,
        },
    ));
    let events = EventBus::new().subscribe(Arc::new(PayrollService::new(store.clone())));
    let uniforms = Data::new(UniformService::new(store.clone(), store.clone(), events));
    let locations: Data<dyn LocationRepository> = Data::from(store.clone() as Arc<dyn LocationRepository>);
    let employees: Data<dyn EmployeeRepository> = Data::from(store.clone() as Arc<dyn EmployeeRepository>);
    let ledger: Data<dyn SalaryLedger> = Data::from(store as Arc<dyn SalaryLedger>);
    let openapi = docs::openapi_for(&config.api_prefix);
    let limiters = Limiters::from_config(&config)?;

    let server_addr = config.server_addr.clone();
    let pool = Data::new(pool);
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(pool.clone())
            .app_data(config.clone())
            .app_data(attendance.clone())
            .app_data(uniforms.clone())
            .app_data(locations.clone())
            .app_data(employees.clone())
            .app_data(ledger.clone())
            .service(health)
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
