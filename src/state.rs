use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::auth::JwtConfig;
use crate::cache::{CacheService, CacheStore};
use crate::config::Config;
use crate::events::EventBus;
use crate::notifications::hub::NotificationHub;
use crate::priority::PriorityQueue;
use crate::search::SearchService;

/// Everything a handler or resolver needs, shared as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: CacheService,
    pub priority: PriorityQueue,
    pub hub: Arc<NotificationHub>,
    pub events: EventBus,
    pub search: SearchService,
    pub jwt: JwtConfig,
    pub config: Config,
}

impl AppState {
    pub fn new(pool: PgPool, store: CacheStore, search: SearchService, config: Config) -> Self {
        Self {
            pool,
            cache: CacheService::new(store.clone(), Duration::from_secs(config.cache_ttl_seconds)),
            priority: PriorityQueue::new(store),
            hub: Arc::new(NotificationHub::new()),
            events: EventBus::default(),
            search,
            jwt: JwtConfig::from_config(&config),
            config,
        }
    }
}
