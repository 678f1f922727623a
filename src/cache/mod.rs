//! # Cache
//!
//! Read-through JSON cache, sorted sets for the task priority queue, and counters for
//! the rate limiter. Redis is used when `REDIS_URL` is set; otherwise everything lives
//! in a [`MemoryStore`] inside the process.
//!
//! Entity and listing keys are built with the helpers in [`keys`]. Reads that fail are
//! logged and treated as a miss so a cache outage never fails a request that the
//! database can still answer.

pub mod keys;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::AppError;
pub use memory::MemoryStore;

/// Storage backend behind [`CacheService`].
#[derive(Clone)]
pub enum CacheStore {
    Redis(ConnectionManager),
    Memory(MemoryStore),
}

/// Redis takes whole seconds; anything shorter is rounded up to one.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

impl CacheStore {
    /// Connects to Redis when a URL is given, otherwise falls back to memory.
    pub async fn connect(redis_url: Option<&str>) -> Result<Self, AppError> {
        match redis_url {
            Some(url) => {
                let client = redis::Client::open(url)?;
                let manager = client.get_connection_manager().await?;
                log::info!("Cache backed by Redis");
                Ok(CacheStore::Redis(manager))
            }
            None => {
                log::info!("REDIS_URL not set, using in-process cache");
                Ok(CacheStore::Memory(MemoryStore::new()))
            }
        }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        match self {
            CacheStore::Redis(conn) => Ok(conn.clone().get(key).await?),
            CacheStore::Memory(store) => store.get(key),
        }
    }

    pub async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError> {
        match self {
            CacheStore::Redis(conn) => {
                let _: () = conn.clone().set_ex(key, value, ttl_seconds(ttl)).await?;
                Ok(())
            }
            CacheStore::Memory(store) => store.set(key, value, ttl),
        }
    }

    pub async fn del(&self, keys: &[String]) -> Result<(), AppError> {
        if keys.is_empty() {
            return Ok(());
        }
        match self {
            CacheStore::Redis(conn) => {
                let _: () = conn.clone().del(keys).await?;
                Ok(())
            }
            CacheStore::Memory(store) => store.del(keys),
        }
    }

    pub async fn keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        match self {
            CacheStore::Redis(conn) => Ok(conn.clone().keys(pattern).await?),
            CacheStore::Memory(store) => store.keys(pattern),
        }
    }

    /// Fixed-window counter: the expiry is set by the first increment only.
    ///
    /// On Redis the increment and `EXPIRE .. NX` go out as one `MULTI` block, so a counter
    /// never outlives its window without a TTL.
    pub async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, AppError> {
        match self {
            CacheStore::Redis(conn) => {
                let (count,): (u64,) = redis::pipe()
                    .atomic()
                    .incr(key, 1u64)
                    .cmd("EXPIRE")
                    .arg(key)
                    .arg(ttl_seconds(ttl))
                    .arg("NX")
                    .ignore()
                    .query_async(&mut conn.clone())
                    .await?;
                Ok(count)
            }
            CacheStore::Memory(store) => store.incr_with_ttl(key, ttl),
        }
    }

    pub async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), AppError> {
        match self {
            CacheStore::Redis(conn) => {
                let _: () = conn.clone().zadd(key, member, score).await?;
                Ok(())
            }
            CacheStore::Memory(store) => store.zadd(key, member, score),
        }
    }

    pub async fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        match self {
            CacheStore::Redis(conn) => {
                let _: () = conn.clone().zrem(key, member).await?;
                Ok(())
            }
            CacheStore::Memory(store) => store.zrem(key, member),
        }
    }

    pub async fn zrevrange(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<String>, AppError> {
        match self {
            CacheStore::Redis(conn) => Ok(conn
                .clone()
                .zrevrange(key, start as isize, stop as isize)
                .await?),
            CacheStore::Memory(store) => store.zrevrange(key, start, stop),
        }
    }

    pub async fn zrevrank(&self, key: &str, member: &str) -> Result<Option<usize>, AppError> {
        match self {
            CacheStore::Redis(conn) => Ok(conn.clone().zrevrank(key, member).await?),
            CacheStore::Memory(store) => store.zrevrank(key, member),
        }
    }
}

/// JSON cache over a [`CacheStore`] with a default TTL.
#[derive(Clone)]
pub struct CacheService {
    store: CacheStore,
    default_ttl: Duration,
}

impl CacheService {
    pub fn new(store: CacheStore, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// A memory-backed cache, for tests and Redis-less deployments.
    pub fn in_memory(default_ttl: Duration) -> Self {
        Self::new(CacheStore::Memory(MemoryStore::new()), default_ttl)
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Cached value at `key`, or `None` on a miss, an expired entry, or a backend failure.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("cache read of {} failed: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("discarding undecodable cache entry {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        self.set_json_with_ttl(key, value, self.default_ttl).await
    }

    /// Write failures are logged; the caller already holds the fresh value.
    pub async fn set_json_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let result = match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, raw, ttl).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            log::warn!("cache write of {} failed: {}", key, e);
        }
    }

    /// Returns the cached value at `key`, or awaits `load`, caches its output and returns it.
    pub async fn remember<T, F>(&self, key: &str, load: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = Result<T, AppError>>,
    {
        if let Some(hit) = self.get_json(key).await {
            return Ok(hit);
        }
        let value = load.await?;
        self.set_json(key, &value).await;
        Ok(value)
    }

    pub async fn del<K: AsRef<str>>(&self, keys: &[K]) -> Result<(), AppError> {
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        self.store.del(&keys).await
    }

    /// Deletes every key matching the glob `pattern`.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<(), AppError> {
        let keys = self.store.keys(pattern).await?;
        self.store.del(&keys).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Widget {
        name: String,
        size: u32,
    }

    fn widget(name: &str, size: u32) -> Widget {
        Widget {
            name: name.into(),
            size,
        }
    }

    #[actix_rt::test]
    async fn test_read_returns_last_write_until_ttl() {
        let cache = CacheService::in_memory(Duration::from_millis(50));

        cache.set_json("widget:1", &widget("first", 1)).await;
        cache.set_json("widget:1", &widget("second", 2)).await;
        assert_eq!(
            cache.get_json::<Widget>("widget:1").await,
            Some(widget("second", 2))
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get_json::<Widget>("widget:1").await, None);
    }

    #[actix_rt::test]
    async fn test_read_returns_nothing_after_invalidation() {
        let cache = CacheService::in_memory(Duration::from_secs(300));
        cache.set_json("task:1", &widget("a", 1)).await;
        cache.set_json("task:2", &widget("b", 2)).await;
        cache.set_json("project:1", &widget("c", 3)).await;

        cache.del(&["task:1"]).await.unwrap();
        assert_eq!(cache.get_json::<Widget>("task:1").await, None);
        assert!(cache.get_json::<Widget>("task:2").await.is_some());

        cache.invalidate_pattern("task:*").await.unwrap();
        assert_eq!(cache.get_json::<Widget>("task:2").await, None);
        assert_eq!(
            cache.get_json::<Widget>("project:1").await,
            Some(widget("c", 3))
        );
    }

    #[test_log::test(actix_rt::test)]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = CacheService::in_memory(Duration::from_secs(300));
        cache
            .store()
            .set("widget:bad", "not json".into(), Duration::from_secs(300))
            .await
            .unwrap();
        assert_eq!(cache.get_json::<Widget>("widget:bad").await, None);
    }

    #[actix_rt::test]
    async fn test_remember_loads_once() {
        let cache = CacheService::in_memory(Duration::from_secs(300));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .remember("widget:7", async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(widget("loaded", 7))
                })
                .await
                .unwrap();
            assert_eq!(value, widget("loaded", 7));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    /// Needs a Redis 7 server in `TEST_REDIS_URL`.
    #[ignore]
    #[actix_rt::test]
    async fn test_redis_counter_always_carries_ttl() {
        let url = std::env::var("TEST_REDIS_URL").expect("TEST_REDIS_URL must be set");
        let store = CacheStore::connect(Some(&url)).await.unwrap();
        let key = format!("rate_limit:test:{}", uuid::Uuid::new_v4());

        assert_eq!(store.incr_with_ttl(&key, Duration::from_secs(30)).await.unwrap(), 1);
        assert_eq!(store.incr_with_ttl(&key, Duration::from_secs(90)).await.unwrap(), 2);

        let CacheStore::Redis(conn) = &store else {
            panic!("expected a Redis store");
        };
        let ttl: i64 = conn.clone().ttl(&key).await.unwrap();
        assert!((1..=30).contains(&ttl), "ttl was {}", ttl);
        store.del(&[key]).await.unwrap();
    }
}
