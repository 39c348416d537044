use actix::{Addr, SyncArbiter};
use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use actix_web::web::Data;
use dotenv::dotenv;

use settings::{Settings, StorageBackend};
use services::db_utils::{AppState, Backend, DbActor, get_db_pool};
use services::memory_store::MemoryDb;

mod actors;
mod allocation;
mod auth;
mod errors;
mod lifecycle;
mod schema;
mod services;
mod settings;
mod types;

fn init_db(settings: &Settings) -> Result<Addr<DbActor>, Box<dyn std::error::Error>> {
    let backend = match settings.storage_backend {
        StorageBackend::Postgres => {
            let db_url = settings.pg_url().ok_or("PG_DATABASE_URL must be set")?;
            Backend::Postgres(get_db_pool(db_url)?)
        }
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store, data is lost on shutdown");
            Backend::Memory(MemoryDb::default())
        }
    };

    Ok(SyncArbiter::start(settings.db_workers, move || DbActor(backend.clone())))
}

fn init_redis_db(settings: &Settings) -> Result<Option<redis::Client>, redis::RedisError> {
    match settings.redis_uri() {
        Some(uri) => redis::Client::open(uri).map(Some),
        None => {
            tracing::info!("REDIS_DATABASE_URI not set, layout cache disabled");
            Ok(None)
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(services::home_page)
        .service(
            web::scope("/auth")
                .service(services::auth_route::auth_page)
        )
        .service(
            web::scope("/restaurants")
                .service(services::restaurants_route::list_restaurants)
                .service(services::restaurants_route::create_restaurant)
                .service(services::restaurants_route::get_restaurant)
                .service(services::restaurants_route::delete_restaurant)
                .service(services::restaurants_route::set_allocation)
                .service(services::restaurants_route::public_layout)
                .service(services::restaurants_route::staff_layout)
                .service(services::restaurants_route::create_floor)
                .service(services::reservations_route::create_reservation)
                .service(services::reservations_route::list_reservations)
        )
        .service(
            web::scope("/floors")
                .service(services::tables_route::delete_floor)
                .service(services::tables_route::create_table)
        )
        .service(
            web::scope("/tables")
                .service(services::tables_route::update_table)
                .service(services::tables_route::set_table_status)
                .service(services::tables_route::delete_table)
        )
        .service(
            web::scope("/reservations")
                .service(services::reservations_route::get_reservation)
                .service(services::reservations_route::set_status)
                .service(services::reservations_route::assign_table)
        )
        .service(
            web::scope("/test")
                .service(services::test_route::healthcheck)
        );
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tablebook=info".into()),
        )
        .init();

    let settings = Settings::load().map_err(|err| {
        tracing::error!(error = %err, "invalid configuration");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;

    let db = init_db(&settings).map_err(|err| {
        tracing::error!(error = %err, "database initialisation failed");
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    })?;
    let redis_db = init_redis_db(&settings).map_err(|err| {
        tracing::error!(error = %err, "invalid redis uri");
        std::io::Error::new(std::io::ErrorKind::InvalidInput, err)
    })?;

    let state = Data::new(AppState {
        db,
        redis_db,
        auth: settings.auth(),
        policy: settings.policy(),
        layout_ttl_s: settings.layout_cache_ttl_s,
    });
    let cors_origin = settings.cors_origin.clone();

    tracing::info!(address = %settings.bind_address, port = settings.port, "starting table booking service");

    HttpServer::new(move || {
        let cors = match &cors_origin {
            Some(origin) => Cors::default()
                .allowed_origin(origin)
                .allow_any_method()
                .allow_any_header()
                .supports_credentials(),
            None => Cors::default(),
        };

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes)
    })
        .bind((settings.bind_address.as_str(), settings.port))?
        .run()
        .await
}
