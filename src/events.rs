//! # Task events
//!
//! In-process message queue between the services that change tasks and the WebSocket
//! rooms watching them. Services publish [`TaskEvent`]s on the [`EventBus`]; the consumer
//! spawned at startup forwards each one to the `task:<id>` room as
//! `taskStatusChanged`, `newComment` or `taskDueSoon`.
//!
//! A deadline scanner runs alongside and publishes `DueSoon` for every unfinished task
//! due within the next 24 hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Status, Task};
use crate::notifications::hub::{task_room, NotificationHub, PushMessage};

/// Something that happened to a task, addressed to the clients watching it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TaskEvent {
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        task_id: Uuid,
        title: String,
        old_status: Status,
        new_status: Status,
        changed_by: Uuid,
    },
    #[serde(rename_all = "camelCase")]
    NewComment {
        task_id: Uuid,
        comment_id: Uuid,
        user_id: Uuid,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    DueSoon {
        task_id: Uuid,
        title: String,
        due_date: DateTime<Utc>,
        assignee_id: Option<Uuid>,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> Uuid {
        match self {
            TaskEvent::StatusChanged { task_id, .. }
            | TaskEvent::NewComment { task_id, .. }
            | TaskEvent::DueSoon { task_id, .. } => *task_id,
        }
    }

    /// Name of the WebSocket event this is delivered as.
    pub fn event_name(&self) -> &'static str {
        match self {
            TaskEvent::StatusChanged { .. } => "taskStatusChanged",
            TaskEvent::NewComment { .. } => "newComment",
            TaskEvent::DueSoon { .. } => "taskDueSoon",
        }
    }

    pub fn to_push(&self) -> Result<PushMessage, AppError> {
        Ok(PushMessage::new(self.event_name(), serde_json::to_value(self)?))
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Events published while nobody is subscribed are dropped.
    pub fn publish(&self, event: TaskEvent) {
        log::debug!(
            "publishing {} for task {} to {} subscriber(s)",
            event.event_name(),
            event.task_id(),
            self.tx.receiver_count()
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Forwards events to their task rooms until the bus is closed.
pub async fn run_consumer(mut rx: broadcast::Receiver<TaskEvent>, hub: Arc<NotificationHub>) {
    loop {
        match rx.recv().await {
            Ok(event) => match event.to_push() {
                Ok(message) => {
                    let delivered = hub.emit_to_room(&task_room(event.task_id()), &message);
                    log::debug!("{} delivered to {} socket(s)", message.event, delivered);
                }
                Err(e) => log::error!("failed to encode {}: {}", event.event_name(), e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("event consumer lagged, {} event(s) skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub fn spawn_consumer(bus: &EventBus, hub: Arc<NotificationHub>) -> JoinHandle<()> {
    tokio::spawn(run_consumer(bus.subscribe(), hub))
}

/// Publishes `DueSoon` for every task not yet done that is due in the next 24 hours.
pub async fn scan_deadlines(pool: &PgPool, bus: &EventBus) -> Result<usize, AppError> {
    let now = Utc::now();
    let due = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE status <> 'DONE' AND due_date > $1 AND due_date <= $2",
        crate::models::task::TASK_COLUMNS
    ))
    .bind(now)
    .bind(now + chrono::Duration::hours(24))
    .fetch_all(pool)
    .await?;

    for task in &due {
        if let Some(due_date) = task.due_date {
            bus.publish(TaskEvent::DueSoon {
                task_id: task.id,
                title: task.title.clone(),
                due_date,
                assignee_id: task.assignee_id,
            });
        }
    }
    Ok(due.len())
}

/// Scans every `period`, floored at one second.
pub fn spawn_deadline_scanner(pool: PgPool, bus: EventBus, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
        loop {
            ticker.tick().await;
            match scan_deadlines(&pool, &bus).await {
                Ok(0) => {}
                Ok(count) => log::info!("{} task(s) due within 24h", count),
                Err(e) => log::error!("deadline scan failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_payload_shape() {
        let task_id = Uuid::nil();
        let user = Uuid::nil();
        let event = TaskEvent::StatusChanged {
            task_id,
            title: "Write docs".into(),
            old_status: Status::Todo,
            new_status: Status::InProgress,
            changed_by: user,
        };
        let push = event.to_push().unwrap();
        assert_eq!(push.event, "taskStatusChanged");
        assert_eq!(
            push.data,
            json!({
                "taskId": task_id,
                "title": "Write docs",
                "oldStatus": "TODO",
                "newStatus": "IN_PROGRESS",
                "changedBy": user,
            })
        );
    }

    #[actix_rt::test]
    async fn test_consumer_routes_events_to_task_room() {
        let bus = EventBus::new(16);
        let hub = Arc::new(NotificationHub::new());
        let task_id = Uuid::new_v4();

        let (watcher, mut watcher_rx) = hub.register(Uuid::new_v4());
        hub.join(watcher, task_room(task_id));
        let (_, mut other_rx) = hub.register(Uuid::new_v4());

        let consumer = spawn_consumer(&bus, Arc::clone(&hub));
        bus.publish(TaskEvent::NewComment {
            task_id,
            comment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "LGTM".into(),
        });

        let message = tokio::time::timeout(Duration::from_secs(1), watcher_rx.recv())
            .await
            .expect("consumer did not forward the event")
            .unwrap();
        assert_eq!(message.event, "newComment");
        assert_eq!(message.data["content"], "LGTM");
        assert!(other_rx.try_recv().is_err());

        drop(bus);
        tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer did not stop when the bus closed")
            .unwrap();
    }

    #[actix_rt::test]
    async fn test_scanner_survives_zero_period() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unreachable")
            .unwrap();
        let scanner = spawn_deadline_scanner(pool, EventBus::new(4), Duration::ZERO);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!scanner.is_finished());
        scanner.abort();
    }
}
