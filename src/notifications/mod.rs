//! # Notifications
//!
//! Persisted per-user notifications, pushed live to the user's open sockets.
//!
//! * [`hub`]: registry of WebSocket connections and task rooms.
//! * [`ws`]: the `/ws/notifications` endpoint.
//!
//! The functions here are the notification service used by the REST routes, the
//! GraphQL resolvers and the other services.

pub mod hub;
pub mod ws;

use serde_json::json;
use uuid::Uuid;

use crate::cache::keys;
use crate::error::AppError;
use crate::events::TaskEvent;
use crate::models::notification::NOTIFICATION_COLUMNS;
use crate::models::{Comment, MessageResponse, NewNotification, Notification, NotificationType, Task};
use crate::state::AppState;
use hub::PushMessage;

/// Stores a notification for `user_id` and pushes it to their sockets.
pub async fn create(
    state: &AppState,
    user_id: Uuid,
    new: NewNotification,
) -> Result<Notification, AppError> {
    let data = match &new.data {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    };
    let notification = sqlx::query_as::<_, Notification>(&format!(
        "INSERT INTO notifications (id, title, message, kind, is_read, user_id, data) \
         VALUES ($1, $2, $3, $4, FALSE, $5, $6) RETURNING {}",
        NOTIFICATION_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.kind)
    .bind(user_id)
    .bind(data)
    .fetch_one(&state.pool)
    .await?;

    state.cache.del(&[keys::notifications(user_id)]).await?;

    match serde_json::to_value(&notification) {
        Ok(payload) => {
            let delivered = state
                .hub
                .notify_user(user_id, &PushMessage::new("notification", payload));
            log::debug!("notification {} pushed to {} socket(s)", notification.id, delivered);
        }
        Err(e) => log::warn!("failed to encode notification {}: {}", notification.id, e),
    }
    Ok(notification)
}

/// Like [`create`], for side effects of another mutation: a failure is logged, not returned.
pub async fn send(state: &AppState, user_id: Uuid, new: NewNotification) {
    let kind = new.kind;
    if let Err(e) = create(state, user_id, new).await {
        log::error!("failed to notify user {} ({:?}): {}", user_id, kind, e);
    }
}

/// The user's notifications, newest first.
pub async fn find_all(state: &AppState, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
    state
        .cache
        .remember(&keys::notifications(user_id), async {
            let notifications = sqlx::query_as::<_, Notification>(&format!(
                "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
                NOTIFICATION_COLUMNS
            ))
            .bind(user_id)
            .fetch_all(&state.pool)
            .await?;
            Ok(notifications)
        })
        .await
}

/// Only the owner can mark a notification; anyone else gets `404`.
pub async fn mark_as_read(
    state: &AppState,
    id: Uuid,
    user_id: Uuid,
) -> Result<Notification, AppError> {
    let notification = sqlx::query_as::<_, Notification>(&format!(
        "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
         WHERE id = $1 AND user_id = $2 RETURNING {}",
        NOTIFICATION_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Notification with ID {} not found", id)))?;

    state.cache.del(&[keys::notifications(user_id)]).await?;
    Ok(notification)
}

pub async fn mark_all_as_read(state: &AppState, user_id: Uuid) -> Result<MessageResponse, AppError> {
    sqlx::query(
        "UPDATE notifications SET is_read = TRUE, updated_at = NOW() \
         WHERE user_id = $1 AND is_read = FALSE",
    )
    .bind(user_id)
    .execute(&state.pool)
    .await?;

    state.cache.del(&[keys::notifications(user_id)]).await?;
    Ok(MessageResponse::new("All notifications marked as read"))
}

pub async fn delete(state: &AppState, id: Uuid, user_id: Uuid) -> Result<MessageResponse, AppError> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Notification with ID {} not found",
            id
        )));
    }

    state.cache.del(&[keys::notifications(user_id)]).await?;
    Ok(MessageResponse::new("Notification deleted"))
}

/// People to tell about a new comment: the assignee and the creator, minus the author.
pub fn comment_recipients(task: &Task, author_id: Uuid) -> Vec<Uuid> {
    let mut recipients = Vec::with_capacity(2);
    for candidate in [task.assignee_id, Some(task.creator_id)].into_iter().flatten() {
        if candidate != author_id && !recipients.contains(&candidate) {
            recipients.push(candidate);
        }
    }
    recipients
}

/// Sends `TASK_COMMENT` to the task's people and publishes the comment to the task room.
pub async fn notify_new_comment(state: &AppState, task: &Task, comment: &Comment) {
    for user_id in comment_recipients(task, comment.user_id) {
        let new = NewNotification::new(
            NotificationType::TaskComment,
            "New Comment",
            format!("New comment on task \"{}\": {}", task.title, comment.content),
        )
        .with_data(json!({ "taskId": task.id, "commentId": comment.id }));
        send(state, user_id, new).await;
    }

    state.events.publish(TaskEvent::NewComment {
        task_id: task.id,
        comment_id: comment.id,
        user_id: comment.user_id,
        content: comment.content.clone(),
    });
}
