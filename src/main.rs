use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod attendance;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::attendance::store::MySqlAttendanceStore;
use crate::docs::ApiDoc;
use crate::utils::username_cache;
use crate::utils::username_filter;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance tracker is running"
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
        .pretty()
        .init();

    info!(
        addr = %config.server_addr,
        prefix = %config.api_prefix,
        check_in_opens = %config.attendance.check_in_opens,
        check_in_closes = %config.attendance.check_in_closes,
        check_out_opens = %config.attendance.check_out_opens,
        min_work_hours = config.attendance.min_work_hours,
        "Server starting..."
    );

    let pool = init_db(&config.database_url).await?;
    let store = MySqlAttendanceStore::new(pool.clone());

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();
    let server_addr = config.server_addr.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = username_filter::warmup_username_filter(&pool_for_filter_warmup, 100).await
        {
            warn!(error = ?e, "Failed to warmup username filter");
        }
    });

    actix_web::rt::spawn(async move {
        // Accounts active in the last 30 days, 250 per batch
        if let Err(e) = username_cache::warmup_username_cache(&pool_for_cache_warmup, 30, 250).await
        {
            warn!(error = ?e, "Failed to warmup username cache");
        }
    });

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(store.clone()))
            .app_data(Data::new(config.clone()))
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
