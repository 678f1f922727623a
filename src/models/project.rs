use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::{Status, Task, UserProfile};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: Status,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Percentage of tasks in `DONE`, 0 to 100.
    pub progress: f64,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const PROJECT_COLUMNS: &str =
    "id, name, description, status, start_date, end_date, progress, owner_id, created_at, updated_at";

/// A project with owner, members and tasks.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub project: Project,
    pub owner: Option<UserProfile>,
    pub members: Vec<UserProfile>,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Partial project update. When `progress` is absent it is recomputed from the tasks.
#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub status: Option<Status>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 0.0, max = 100.0))]
    pub progress: Option<f64>,
}

/// Share of `DONE` tasks as a percentage; an empty project is at 0.
pub fn calculate_progress(statuses: &[Status]) -> f64 {
    if statuses.is_empty() {
        return 0.0;
    }
    let done = statuses.iter().filter(|s| **s == Status::Done).count();
    done as f64 / statuses.len() as f64 * 100.0
}
