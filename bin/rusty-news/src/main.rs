//! # Rusty-News Binary
//!
//! The entry point that assembles the application based on compile-time features.

mod config;

use std::io;
use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use rn_api::handlers::AppState;
use rn_api::{configure_routes, middleware};
use rn_core::{ItemRepo, ItemService};

use crate::config::Config;

#[cfg(not(any(feature = "db-sqlite", feature = "db-memory")))]
compile_error!("enable one of the `db-sqlite` or `db-memory` features");

#[cfg(not(feature = "auth-simple"))]
compile_error!("the `auth-simple` feature is required");

// Feature-gated imports
#[cfg(feature = "db-sqlite")]
use rn_db_sqlite::SqliteItemRepo;

#[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
use rn_core::memory::InMemoryItemRepo;

#[cfg(feature = "auth-simple")]
use rn_auth_simple::SimpleIdentityResolver;

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::load()?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let repo: Arc<dyn ItemRepo> = Arc::new(
        SqliteItemRepo::new(&config.database_url)
            .await
            .map_err(|e| {
                log::error!("Failed to init SQLite at {}: {e:#}", config.database_url);
                io::Error::other(e)
            })?,
    );

    #[cfg(all(feature = "db-memory", not(feature = "db-sqlite")))]
    let repo: Arc<dyn ItemRepo> = {
        log::warn!("Using the in-memory item store; items are lost on exit");
        Arc::new(InMemoryItemRepo::new())
    };

    // 2. Initialize Auth Implementation
    #[cfg(feature = "auth-simple")]
    let identity = SimpleIdentityResolver::new(&config.auth_secret);

    // 3. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = web::Data::new(AppState {
        items: ItemService::new(repo, config.engine.clone()),
        identity: Box::new(identity),
    });

    log::info!(
        "Rusty-News starting on http://{}:{} ({} items per page, gravity {})",
        config.host,
        config.port,
        config.engine.page_size,
        config.engine.gravity
    );

    let cors_origin = config.cors_origin.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::security_headers())
            .wrap(middleware::cors_policy(&cors_origin))
            .wrap(middleware::standard_middleware())
            .configure(configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
