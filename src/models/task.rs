use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{Project, UserProfile};

/// Represents the priority of a task.
/// Corresponds to the `task_priority` SQL enum.
#[derive(
    Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Enum,
)]
#[sqlx(type_name = "task_priority", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority, the default for new tasks.
    #[default]
    Medium,
    /// High priority.
    High,
    /// Urgent priority.
    Urgent,
}

impl Priority {
    /// Weight used by the priority queue score.
    pub fn weight(self) -> i64 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
            Priority::Urgent => 4,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Urgent => "URGENT",
        };
        f.write_str(label)
    }
}

/// Workflow status shared by tasks and projects.
/// Corresponds to the `work_status` SQL enum.
#[derive(
    Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Enum,
)]
#[sqlx(type_name = "work_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Not started yet.
    #[default]
    Todo,
    /// Currently being worked on.
    InProgress,
    /// Finished and waiting for review.
    Review,
    /// Completed.
    Done,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Status::Todo => "TODO",
            Status::InProgress => "IN_PROGRESS",
            Status::Review => "REVIEW",
            Status::Done => "DONE",
        };
        f.write_str(label)
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub creator_id: Uuid,
    pub parent_task_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const TASK_COLUMNS: &str = "id, title, description, status, priority, due_date, \
     project_id, assignee_id, creator_id, parent_task_id, created_at, updated_at";

/// A task with its relations resolved: project, people, parent and subtasks.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct TaskDetails {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub task: Task,
    pub project: Option<Project>,
    pub assignee: Option<UserProfile>,
    pub creator: Option<UserProfile>,
    pub parent_task: Option<Task>,
    pub subtasks: Vec<Task>,
}

/// Payload for creating a task. New tasks always start as `TODO`.
#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Maximum length of 5000 characters if provided.
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub project_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub parent_task_id: Option<Uuid>,
    /// Defaults to `MEDIUM`.
    pub priority: Option<Priority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
    pub parent_task_id: Option<Uuid>,
    pub due_date: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a new `TODO` task owned by `creator_id`.
    pub fn new(input: CreateTaskInput, creator_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            status: Status::Todo,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            project_id: input.project_id,
            assignee_id: input.assignee_id,
            creator_id,
            parent_task_id: input.parent_task_id,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> CreateTaskInput {
        CreateTaskInput {
            title: title.to_string(),
            description: Some("Test Description".to_string()),
            project_id: Uuid::new_v4(),
            assignee_id: None,
            parent_task_id: None,
            priority: None,
            due_date: Some(Utc::now()),
        }
    }

    #[test]
    fn test_task_creation() {
        let creator = Uuid::new_v4();
        let task = Task::new(input("Test Task"), creator);
        assert_eq!(task.title, "Test Task");
        assert_eq!(task.creator_id, creator);
        assert_eq!(task.status, Status::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert!(task.assignee_id.is_none());
    }

    #[test]
    fn test_task_validation() {
        assert!(input("Valid Task").validate().is_ok());
        assert!(input("").validate().is_err());
        assert!(input(&"a".repeat(201)).validate().is_err());

        let update = UpdateTaskInput {
            title: Some(String::new()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_string(&Status::InProgress).unwrap(), "\"IN_PROGRESS\"");
        assert_eq!(serde_json::to_string(&Priority::Urgent).unwrap(), "\"URGENT\"");
        assert_eq!(Status::Review.to_string(), "REVIEW");
    }

    #[test]
    fn test_priority_weights_are_ordered() {
        let weights: Vec<i64> = [Priority::Low, Priority::Medium, Priority::High, Priority::Urgent]
            .into_iter()
            .map(Priority::weight)
            .collect();
        assert_eq!(weights, vec![1, 2, 3, 4]);
    }
}
