use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use glob::Pattern;

use crate::error::AppError;

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Below this many strings, writes never sweep.
const SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
struct Inner {
    values: Mutex<HashMap<String, Entry>>,
    sorted_sets: Mutex<HashMap<String, HashMap<String, f64>>>,
    /// Size at which the next write sweeps expired strings; doubles the live count after
    /// each sweep so a map of live entries is not rescanned on every write.
    sweep_at: AtomicUsize,
}

/// In-process stand-in for Redis, used when `REDIS_URL` is not configured and in tests.
///
/// Strings expire on access, and writes drop expired strings once the map grows past a
/// threshold. Sorted sets never expire.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::CacheError("memory cache lock poisoned".into()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let mut values = lock(&self.inner.values)?;
        let now = Instant::now();
        match values.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), AppError> {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: Some(now + ttl),
        };
        let mut values = lock(&self.inner.values)?;
        self.insert(&mut values, key, entry, now);
        Ok(())
    }

    fn insert(&self, values: &mut HashMap<String, Entry>, key: &str, entry: Entry, now: Instant) {
        let threshold = self
            .inner
            .sweep_at
            .load(AtomicOrdering::Relaxed)
            .max(SWEEP_THRESHOLD);
        if values.len() >= threshold && !values.contains_key(key) {
            values.retain(|_, entry| entry.is_live(now));
            self.inner
                .sweep_at
                .store(values.len().saturating_mul(2), AtomicOrdering::Relaxed);
        }
        values.insert(key.to_string(), entry);
    }

    pub fn del(&self, keys: &[String]) -> Result<(), AppError> {
        let mut values = lock(&self.inner.values)?;
        let mut sets = lock(&self.inner.sorted_sets)?;
        for key in keys {
            values.remove(key);
            sets.remove(key);
        }
        Ok(())
    }

    pub fn keys(&self, pattern: &str) -> Result<Vec<String>, AppError> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| AppError::CacheError(format!("invalid key pattern: {}", e)))?;
        let now = Instant::now();
        let values = lock(&self.inner.values)?;
        let sets = lock(&self.inner.sorted_sets)?;
        let live = values
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(key, _)| key);
        Ok(live
            .chain(sets.keys())
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect())
    }

    /// Increments the counter at `key`. A fresh counter starts at 1 and expires after `ttl`;
    /// later increments keep the original expiry.
    pub fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<u64, AppError> {
        let mut values = lock(&self.inner.values)?;
        let now = Instant::now();
        match values.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                let current: u64 = entry.value.parse().map_err(|_| {
                    AppError::CacheError(format!("value at {} is not an integer", key))
                })?;
                let next = current + 1;
                entry.value = next.to_string();
                Ok(next)
            }
            _ => {
                let entry = Entry {
                    value: "1".into(),
                    expires_at: Some(now + ttl),
                };
                self.insert(&mut values, key, entry, now);
                Ok(1)
            }
        }
    }

    pub fn zadd(&self, key: &str, member: &str, score: f64) -> Result<(), AppError> {
        lock(&self.inner.sorted_sets)?
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string(), score);
        Ok(())
    }

    pub fn zrem(&self, key: &str, member: &str) -> Result<(), AppError> {
        let mut sets = lock(&self.inner.sorted_sets)?;
        if let Some(set) = sets.get_mut(key) {
            set.remove(member);
            if set.is_empty() {
                sets.remove(key);
            }
        }
        Ok(())
    }

    /// Members ranked from `start` to `stop` inclusive, highest score first.
    pub fn zrevrange(&self, key: &str, start: usize, stop: usize) -> Result<Vec<String>, AppError> {
        let sets = lock(&self.inner.sorted_sets)?;
        let ranked = sets.get(key).map(descending).unwrap_or_default();
        Ok(ranked
            .into_iter()
            .skip(start)
            .take(stop.saturating_sub(start).saturating_add(1))
            .collect())
    }

    pub fn zrevrank(&self, key: &str, member: &str) -> Result<Option<usize>, AppError> {
        let sets = lock(&self.inner.sorted_sets)?;
        Ok(sets
            .get(key)
            .and_then(|set| descending(set).iter().position(|m| m == member)))
    }
}

/// Same order as Redis `ZREVRANGE`: score descending, ties by member descending.
fn descending(set: &HashMap<String, f64>) -> Vec<String> {
    let mut entries: Vec<(&String, &f64)> = set.iter().collect();
    entries.sort_by(|a, b| match b.1.total_cmp(a.1) {
        Ordering::Equal => b.0.cmp(a.0),
        other => other,
    });
    entries.into_iter().map(|(member, _)| member.clone()).collect()
}
