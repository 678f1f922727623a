use std::fmt::Display;
use std::io;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;

use pmhub::auth::AuthMiddleware;
use pmhub::cache::CacheStore;
use pmhub::config::Config;
use pmhub::notifications::ws;
use pmhub::rate_limit::{RateLimit, RateLimiter};
use pmhub::search::SearchService;
use pmhub::state::AppState;
use pmhub::{events, graphql, routes};

fn startup_error(e: impl Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(startup_error)?;
    sqlx::migrate!().run(&pool).await.map_err(startup_error)?;

    let store = CacheStore::connect(config.redis_url.as_deref())
        .await
        .map_err(startup_error)?;
    let search = SearchService::new(config.meili_url.as_deref(), config.meili_key.as_deref())
        .map_err(startup_error)?;
    if search.is_indexed() {
        if let Err(e) = search.prepare_index().await {
            log::warn!("search index not prepared: {}", e);
        }
    } else {
        log::info!("MEILI_URL not set, search falls back to database queries");
    }

    let state = AppState::new(pool.clone(), store.clone(), search, config.clone());
    let schema = graphql::build_schema(state.clone());
    let limiter = RateLimiter::from_config(store, &config);

    events::spawn_consumer(&state.events, state.hub.clone());
    events::spawn_deadline_scanner(
        pool,
        state.events.clone(),
        Duration::from_secs(config.deadline_scan_interval_seconds),
    );

    log::info!("Starting pmhub server at {}", config.server_url());
    let frontend_url = config.frontend_url.clone();
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&frontend_url)
            .allow_any_method()
            .allow_any_header()
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(schema.clone()))
            .service(routes::health::health)
            .service(
                web::scope("/ws")
                    .wrap(RateLimit::new(limiter.clone()))
                    .service(ws::notifications_socket),
            )
            .service(
                web::resource("/graphql")
                    .wrap(RateLimit::new(limiter.clone()))
                    .route(web::post().to(graphql::graphql_handler))
                    .route(web::get().to(graphql::graphiql)),
            )
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(state.jwt.clone()))
                    .wrap(RateLimit::new(limiter.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
