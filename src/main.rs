use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod service;
mod store;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::routes::Limiters;
use crate::service::{
    clock::{Clock, SystemClock},
    directory::DepartmentDirectory,
    engine::{AttendanceEngine, Thresholds},
    report::ReportAggregator,
    users::UserAdmin,
};
use crate::store::{Store, mysql::MySqlStore};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(offset = %config.org_offset, "Server starting...");

    let pool = init_db(&config.database_url).await?;
    let store: Arc<dyn Store> = Arc::new(MySqlStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new(config.org_offset));
    let thresholds = Thresholds {
        late_minutes: config.late_threshold_minutes,
        early_minutes: config.early_threshold_minutes,
    };

    let directory = Arc::new(DepartmentDirectory::new(store.clone()));
    let engine = Data::new(AttendanceEngine::new(
        store.clone(),
        directory.clone(),
        clock.clone(),
        thresholds,
    ));
    let reports = Data::new(ReportAggregator::new(store.clone(), directory.clone(), clock));
    let users = Data::new(UserAdmin::new(store, directory.clone()));
    let directory = Data::from(directory);

    match (&config.superadmin_username, &config.superadmin_password) {
        (Some(username), Some(password)) => {
            users.ensure_superadmin(username, password).await?;
        }
        (None, None) => {}
        _ => warn!(
            "SUPERADMIN_USERNAME and SUPERADMIN_PASSWORD must be set together, skipping bootstrap"
        ),
    }

    let limiters = Limiters::new(&config)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(config.clone()))
            .app_data(engine.clone())
            .app_data(reports.clone())
            .app_data(users.clone())
            .app_data(directory.clone())
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config, &limiters))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
