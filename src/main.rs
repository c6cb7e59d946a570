use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use std::sync::Arc;

mod api;
mod calculation;
mod config;
mod db;
mod docs;
mod ingest;
mod model;
mod routes;
mod state;
mod store;
mod utils;

use config::Config;
use db::init_db;
use routes::RateLimits;
use state::AppState;
use store::{ContributionStore, MemoryStore, MySqlStore};

use crate::docs::ApiDoc;
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    "ok"
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

    info!("Server starting...");

    let store: Arc<dyn ContributionStore> = match &config.database_url {
        Some(url) => Arc::new(MySqlStore::new(init_db(url).await?)),
        None => {
            warn!("DATABASE_URL not set, keeping data in memory; it is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let state = AppState::new(store);
    let limits = Arc::new(RateLimits::from_config(&config)?);

    let server_addr = config.server_addr.clone();
    info!(addr = %server_addr, prefix = %config.api_prefix, "Listening");

    HttpServer::new(move || {
        let limits = limits.clone();
        let route_config = config.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(state.clone()))
            .app_data(Data::new(config.clone()))
            .service(health)
            .configure(move |cfg| routes::configure(cfg, &route_config, &limits))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
