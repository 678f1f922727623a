//! Task priority queue: a sorted set of task ids keyed by an urgency score.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cache::{keys, CacheStore};
use crate::error::AppError;
use crate::models::{Priority, Status, Task};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Most ids [`PriorityQueue::next`] hands out at once.
pub const MAX_QUEUE_LIMIT: usize = 100;

/// `weight × 1000 + max(0, 1000 − daysUntilDue × 100) + (IN_PROGRESS ? 500 : 0)`.
///
/// Days until due are rounded up, so anything due within the next 24 hours counts as one
/// day. Overdue tasks have a negative day count and therefore score above 1000 on the
/// time component.
pub fn priority_score(
    priority: Priority,
    due_date: Option<DateTime<Utc>>,
    status: Status,
    now: DateTime<Utc>,
) -> f64 {
    let base = (priority.weight() * 1000) as f64;

    let time = match due_date {
        Some(due) => {
            let days = days_until(due, now);
            (1000.0 - days * 100.0).max(0.0)
        }
        None => 0.0,
    };

    let status_bonus = if status == Status::InProgress { 500.0 } else { 0.0 };

    base + time + status_bonus
}

fn days_until(due: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (due - now).num_milliseconds() as f64;
    (millis / 1000.0 / SECONDS_PER_DAY).ceil()
}

/// Ranking of open tasks, stored under [`keys::PRIORITY_QUEUE`].
#[derive(Clone)]
pub struct PriorityQueue {
    store: CacheStore,
}

impl PriorityQueue {
    pub fn new(store: CacheStore) -> Self {
        Self { store }
    }

    pub async fn add(&self, task: &Task) -> Result<(), AppError> {
        let score = priority_score(task.priority, task.due_date, task.status, Utc::now());
        self.store
            .zadd(keys::PRIORITY_QUEUE, &task.id.to_string(), score)
            .await
    }

    pub async fn remove(&self, task_id: Uuid) -> Result<(), AppError> {
        self.store
            .zrem(keys::PRIORITY_QUEUE, &task_id.to_string())
            .await
    }

    /// Re-scores `task`, or drops it from the queue once it is done.
    pub async fn update(&self, task: &Task) -> Result<(), AppError> {
        if task.status == Status::Done {
            self.remove(task.id).await
        } else {
            self.add(task).await
        }
    }

    /// Up to `limit` task ids (at most [`MAX_QUEUE_LIMIT`]), highest score first.
    pub async fn next(&self, limit: usize) -> Result<Vec<Uuid>, AppError> {
        let limit = limit.min(MAX_QUEUE_LIMIT);
        if limit == 0 {
            return Ok(Vec::new());
        }
        let members = self
            .store
            .zrevrange(keys::PRIORITY_QUEUE, 0, limit - 1)
            .await?;
        Ok(members
            .iter()
            .filter_map(|member| Uuid::parse_str(member).ok())
            .collect())
    }

    /// 0-based rank from the top, or -1 when the task is not queued.
    pub async fn position(&self, task_id: Uuid) -> Result<i64, AppError> {
        let rank = self
            .store
            .zrevrank(keys::PRIORITY_QUEUE, &task_id.to_string())
            .await?;
        Ok(rank.map_or(-1, |r| r as i64))
    }
}
