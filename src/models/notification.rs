use async_graphql::{Enum, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Corresponds to the `notification_type` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, sqlx::Type, Enum)]
#[sqlx(type_name = "notification_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    TaskAssigned,
    TaskStatusChanged,
    TaskComment,
    TaskDueSoon,
    ProjectInvitation,
    ProjectRoleChanged,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    #[graphql(name = "type")]
    pub kind: NotificationType,
    pub is_read: bool,
    pub user_id: Uuid,
    /// JSON-encoded payload, e.g. `{"taskId":"..."}`.
    pub data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const NOTIFICATION_COLUMNS: &str =
    "id, title, message, kind, is_read, user_id, data, created_at, updated_at";

/// What a service hands to the notification service to deliver to one user.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    pub kind: NotificationType,
    pub data: Option<serde_json::Value>,
}

impl NewNotification {
    pub fn new(kind: NotificationType, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            kind,
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Generic `{ "message": ... }` acknowledgement for deletes and bulk updates.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, PartialEq)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_notification_serializes_kind_as_type() {
        let now = Utc::now();
        let notification = Notification {
            id: Uuid::nil(),
            title: "Task Assigned".into(),
            message: "You have been assigned to task: Ship it".into(),
            kind: NotificationType::TaskAssigned,
            is_read: false,
            user_id: Uuid::nil(),
            data: Some(json!({ "taskId": "abc" }).to_string()),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(&notification).unwrap();
        assert_eq!(value["type"], "TASK_ASSIGNED");
        assert_eq!(value["isRead"], false);
        assert!(value.get("kind").is_none());
    }

    #[test]
    fn test_new_notification_builder() {
        let n = NewNotification::new(NotificationType::System, "Task Deleted", "gone")
            .with_data(json!({ "taskId": "1" }));
        assert_eq!(n.kind, NotificationType::System);
        assert_eq!(n.data, Some(json!({ "taskId": "1" })));
    }
}
