use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::auth::password::validate_password_strength;

/// Account role, used by the role guards on REST routes and GraphQL resolvers.
/// Corresponds to the `user_role` SQL enum.
#[derive(
    Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, Enum,
)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Admin,
    ProjectManager,
}

/// A user row as stored, including the password hash. Never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, SimpleObject, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub(crate) const PROFILE_COLUMNS: &str =
    "id, name, email, role, avatar, is_active, created_at, updated_at";

pub(crate) const RECORD_COLUMNS: &str =
    "id, name, email, password_hash, role, avatar, is_active, created_at, updated_at";

impl From<UserRecord> for UserProfile {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            role: record.role,
            avatar: record.avatar,
            is_active: record.is_active,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A user together with the ids of the projects they belong to and the tasks assigned to them.
#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(flatten)]
    #[graphql(flatten)]
    pub profile: UserProfile,
    pub project_ids: Vec<Uuid>,
    pub task_ids: Vec<Uuid>,
}

/// Payload for creating a user, either through registration or by an admin.
#[derive(Debug, Clone, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "validate_password_strength")]
    pub password: String,
    #[validate(length(max = 2048))]
    pub avatar: Option<String>,
    pub role: Option<Role>,
}

/// Partial update of a user. `role` and `is_active` are only honoured for admins.
#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom = "validate_password_strength")]
    pub password: Option<String>,
    #[validate(length(max = 2048))]
    pub avatar: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserInput {
    /// True when the update touches fields only an admin may change.
    pub fn touches_privileged_fields(&self) -> bool {
        self.role.is_some() || self.is_active.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn input(email: &str, password: &str) -> CreateUserInput {
        CreateUserInput {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            avatar: None,
            role: None,
        }
    }

    #[test]
    fn test_create_user_input_validation() {
        assert!(input("test@example.com", "Password123").validate().is_ok());
        assert!(input("invalid-email", "Password123").validate().is_err());
        assert!(input("test@example.com", "short").validate().is_err());
        assert!(input("test@example.com", "alllowercase1").validate().is_err());
    }

    #[test]
    fn test_update_user_input_validates_only_present_fields() {
        let empty = UpdateUserInput::default();
        assert!(empty.validate().is_ok());
        assert!(!empty.touches_privileged_fields());

        let bad_email = UpdateUserInput {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());

        let promote = UpdateUserInput {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert!(promote.touches_privileged_fields());
    }

    #[test]
    fn test_role_serializes_like_the_database_enum() {
        assert_eq!(
            serde_json::to_string(&Role::ProjectManager).unwrap(),
            "\"PROJECT_MANAGER\""
        );
        let role: Role = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
