#![allow(dead_code)]

use dotenv::dotenv;
use pmhub::cache::{CacheStore, MemoryStore};
use pmhub::config::Config;
use pmhub::search::SearchService;
use pmhub::state::AppState;
use sqlx::postgres::PgPoolOptions;

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        server_port: 5000,
        server_host: "127.0.0.1".into(),
        jwt_secret: "integration_secret".into(),
        jwt_refresh_secret: "integration_refresh_secret".into(),
        jwt_expiration_hours: 1,
        jwt_refresh_expiration_days: 1,
        redis_url: None,
        meili_url: None,
        meili_key: None,
        frontend_url: "http://localhost:3000".into(),
        cache_ttl_seconds: 60,
        rate_limit_max_requests: 100,
        rate_limit_window_seconds: 60,
        deadline_scan_interval_seconds: 3600,
        trusted_proxies: Vec::new(),
    }
}

/// State whose pool never connects. Enough for anything that fails before a query.
pub fn lazy_state(config: Config) -> AppState {
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("valid database url");
    AppState::new(
        pool,
        CacheStore::Memory(MemoryStore::new()),
        SearchService::disabled(),
        config,
    )
}

/// State over the database in `DATABASE_URL`, migrated.
pub async fn db_state() -> AppState {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPoolOptions::new()
        .connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    AppState::new(
        pool,
        CacheStore::Memory(MemoryStore::new()),
        SearchService::disabled(),
        test_config(&database_url),
    )
}

/// The application as `main` assembles it, over `$state`.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {{
        let state: pmhub::state::AppState = $state;
        let schema = pmhub::graphql::build_schema(state.clone());
        let limiter = pmhub::rate_limit::RateLimiter::from_config(
            state.cache.store().clone(),
            &state.config,
        );
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new(state.clone()))
                .app_data(actix_web::web::Data::new(schema))
                .service(pmhub::routes::health::health)
                .service(
                    actix_web::web::scope("/ws")
                        .wrap(pmhub::rate_limit::RateLimit::new(limiter.clone()))
                        .service(pmhub::notifications::ws::notifications_socket),
                )
                .service(
                    actix_web::web::resource("/graphql")
                        .wrap(pmhub::rate_limit::RateLimit::new(limiter.clone()))
                        .route(actix_web::web::post().to(pmhub::graphql::graphql_handler)),
                )
                .service(
                    actix_web::web::scope("/api")
                        .wrap(pmhub::auth::AuthMiddleware::new(state.jwt.clone()))
                        .wrap(pmhub::rate_limit::RateLimit::new(limiter))
                        .configure(pmhub::routes::config),
                ),
        )
        .await
    }};
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}+{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}
