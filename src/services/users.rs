use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, require_role, Claims};
use crate::cache::keys;
use crate::error::AppError;
use crate::models::user::{PROFILE_COLUMNS, RECORD_COLUMNS};
use crate::models::{
    CreateUserInput, MessageResponse, Role, UpdateUserInput, UserDetails, UserProfile, UserRecord,
};
use crate::search::DocumentKind;
use crate::state::AppState;

const MANAGERS: [Role; 2] = [Role::Admin, Role::ProjectManager];

/// Key patterns that can hold rows cascading from a deleted user. `task:*` leaves the
/// priority queue key alone.
const SWEPT_ON_USER_DELETE: [&str; 7] = [
    "task:*",
    "tasks",
    "project:*",
    "projects",
    "user:*",
    "comment:*",
    "comments:all",
];

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("User with ID {} not found", id))
}

/// All users. Admins and project managers only.
pub async fn list(state: &AppState, actor: &Claims) -> Result<Vec<UserProfile>, AppError> {
    require_role(actor, &MANAGERS)?;
    state
        .cache
        .remember(keys::USERS_ALL, async {
            let users = sqlx::query_as::<_, UserProfile>(&format!(
                "SELECT {} FROM users ORDER BY created_at DESC",
                PROFILE_COLUMNS
            ))
            .fetch_all(&state.pool)
            .await?;
            Ok(users)
        })
        .await
}

/// A user with the ids of the projects they belong to and the tasks assigned to them.
pub async fn get(state: &AppState, id: Uuid) -> Result<UserDetails, AppError> {
    state
        .cache
        .remember(&keys::user(id), async {
            let profile = find_profile(state, id).await?;
            let project_ids: Vec<Uuid> = sqlx::query_scalar(
                "SELECT project_id FROM project_members WHERE user_id = $1",
            )
            .bind(id)
            .fetch_all(&state.pool)
            .await?;
            let task_ids: Vec<Uuid> =
                sqlx::query_scalar("SELECT id FROM tasks WHERE assignee_id = $1")
                    .bind(id)
                    .fetch_all(&state.pool)
                    .await?;
            Ok(UserDetails {
                profile,
                project_ids,
                task_ids,
            })
        })
        .await
}

/// Uncached profile lookup.
pub async fn find_profile(state: &AppState, id: Uuid) -> Result<UserProfile, AppError> {
    sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn find_record_by_email(
    state: &AppState,
    email: &str,
) -> Result<Option<UserRecord>, AppError> {
    Ok(sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE email = $1",
        RECORD_COLUMNS
    ))
    .bind(email)
    .fetch_optional(&state.pool)
    .await?)
}

async fn ensure_email_free(state: &AppState, email: &str) -> Result<(), AppError> {
    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(email)
        .fetch_one(&state.pool)
        .await?;
    if taken {
        Err(AppError::Conflict("Email already exists".into()))
    } else {
        Ok(())
    }
}

/// Inserts a user. Fails with `409 Conflict` when the email is taken.
pub async fn insert(state: &AppState, input: CreateUserInput) -> Result<UserProfile, AppError> {
    input.validate()?;
    ensure_email_free(state, &input.email).await?;
    let password_hash = hash_password(&input.password)?;

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "INSERT INTO users (id, name, email, password_hash, role, avatar, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, TRUE) RETURNING {}",
        PROFILE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.email)
    .bind(password_hash)
    .bind(input.role.unwrap_or_default())
    .bind(&input.avatar)
    .fetch_one(&state.pool)
    .await?;

    state.cache.del(&[keys::USERS_ALL]).await?;
    Ok(user)
}

/// Admin-only user creation, with any role.
pub async fn create(
    state: &AppState,
    actor: &Claims,
    input: CreateUserInput,
) -> Result<UserProfile, AppError> {
    require_role(actor, &[Role::Admin])?;
    insert(state, input).await
}

/// Updates `id`. Users may update themselves; admins may update anyone and are the only
/// ones allowed to change `role` or `isActive`.
pub async fn update(
    state: &AppState,
    actor: &Claims,
    id: Uuid,
    input: UpdateUserInput,
) -> Result<UserProfile, AppError> {
    let is_admin = actor.role == Role::Admin;
    if actor.sub != id && !is_admin {
        return Err(AppError::Forbidden("You can only update your own account".into()));
    }
    if input.touches_privileged_fields() && !is_admin {
        return Err(AppError::Forbidden(
            "Only admins can change role or account status".into(),
        ));
    }
    input.validate()?;

    let current = find_profile(state, id).await?;
    if let Some(email) = input.email.as_deref() {
        if email != current.email {
            ensure_email_free(state, email).await?;
        }
    }
    let password_hash = match input.password.as_deref() {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE users SET \
            name = COALESCE($2, name), \
            email = COALESCE($3, email), \
            password_hash = COALESCE($4, password_hash), \
            avatar = COALESCE($5, avatar), \
            role = COALESCE($6, role), \
            is_active = COALESCE($7, is_active), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        PROFILE_COLUMNS
    ))
    .bind(id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(password_hash)
    .bind(&input.avatar)
    .bind(input.role)
    .bind(input.is_active)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    invalidate(state, id).await?;
    Ok(user)
}

/// Admin-only. Owned projects, created tasks and authored comments go with the user, so
/// every cached entity and listing is swept and the removed tasks leave the priority queue
/// and the search index.
pub async fn delete(state: &AppState, actor: &Claims, id: Uuid) -> Result<MessageResponse, AppError> {
    require_role(actor, &[Role::Admin])?;
    let doomed_tasks: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM tasks \
         WHERE creator_id = $1 OR project_id IN (SELECT id FROM projects WHERE owner_id = $1)",
    )
    .bind(id)
    .fetch_all(&state.pool)
    .await?;
    let doomed_projects: Vec<Uuid> =
        sqlx::query_scalar("SELECT id FROM projects WHERE owner_id = $1")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(not_found(id));
    }

    for task_id in doomed_tasks {
        if let Err(e) = state.priority.remove(task_id).await {
            log::warn!("failed to dequeue task {}: {}", task_id, e);
        }
        state.search.remove(DocumentKind::Task, task_id).await;
    }
    for project_id in doomed_projects {
        state.search.remove(DocumentKind::Project, project_id).await;
    }

    for pattern in SWEPT_ON_USER_DELETE {
        state.cache.invalidate_pattern(pattern).await?;
    }
    invalidate(state, id).await?;
    log::info!("user {} deleted", id);
    Ok(MessageResponse::new("User deleted successfully"))
}

async fn invalidate(state: &AppState, id: Uuid) -> Result<(), AppError> {
    state
        .cache
        .del(&[keys::USERS_ALL.to_string(), keys::user(id)])
        .await
}
