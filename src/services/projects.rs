use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_owner_or_admin, require_role, Claims};
use crate::cache::keys;
use crate::error::AppError;
use crate::models::project::{calculate_progress, PROJECT_COLUMNS};
use crate::models::task::TASK_COLUMNS;
use crate::models::user::PROFILE_COLUMNS;
use crate::models::{
    CreateProjectInput, MessageResponse, NewNotification, NotificationType, Project,
    ProjectDetails, Role, Status, Task, UpdateProjectInput, UserProfile,
};
use crate::notifications;
use crate::search::DocumentKind;
use crate::state::AppState;

const MANAGERS: [Role; 2] = [Role::Admin, Role::ProjectManager];

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Project with ID {} not found", id))
}

/// Creates a project owned by the caller, who also becomes its first member.
pub async fn create(
    state: &AppState,
    actor: &Claims,
    input: CreateProjectInput,
) -> Result<ProjectDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    input.validate()?;

    let mut tx = state.pool.begin().await?;
    let project = sqlx::query_as::<_, Project>(&format!(
        "INSERT INTO projects (id, name, description, status, start_date, end_date, progress, owner_id) \
         VALUES ($1, $2, $3, $4, $5, $6, 0, $7) RETURNING {}",
        PROJECT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.status.unwrap_or_default())
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(actor.sub)
    .fetch_one(&mut *tx)
    .await?;
    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project.id)
        .bind(actor.sub)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    invalidate(state, project.id, &[actor.sub]).await?;
    state.search.index_project(&project).await;
    load_details(state, project).await
}

pub async fn list(state: &AppState) -> Result<Vec<Project>, AppError> {
    state
        .cache
        .remember(keys::PROJECTS_ALL, async {
            let projects = sqlx::query_as::<_, Project>(&format!(
                "SELECT {} FROM projects ORDER BY created_at DESC",
                PROJECT_COLUMNS
            ))
            .fetch_all(&state.pool)
            .await?;
            Ok(projects)
        })
        .await
}

/// Projects `user_id` owns or is a member of.
pub async fn for_user(state: &AppState, user_id: Uuid) -> Result<Vec<Project>, AppError> {
    state
        .cache
        .remember(&keys::user_projects(user_id), async {
            let projects = sqlx::query_as::<_, Project>(&format!(
                "SELECT {} FROM projects \
                 WHERE owner_id = $1 \
                    OR id IN (SELECT project_id FROM project_members WHERE user_id = $1) \
                 ORDER BY created_at DESC",
                PROJECT_COLUMNS
            ))
            .bind(user_id)
            .fetch_all(&state.pool)
            .await?;
            Ok(projects)
        })
        .await
}

pub async fn get(state: &AppState, id: Uuid) -> Result<ProjectDetails, AppError> {
    state
        .cache
        .remember(&keys::project(id), async {
            let project = find(state, id).await?;
            load_details(state, project).await
        })
        .await
}

/// Uncached project row.
pub async fn find(state: &AppState, id: Uuid) -> Result<Project, AppError> {
    sqlx::query_as::<_, Project>(&format!(
        "SELECT {} FROM projects WHERE id = $1",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))
}

async fn load_details(state: &AppState, project: Project) -> Result<ProjectDetails, AppError> {
    let owner = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(project.owner_id)
    .fetch_optional(&state.pool)
    .await?;
    let members = members(state, project.id).await?;
    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
        TASK_COLUMNS
    ))
    .bind(project.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(ProjectDetails {
        project,
        owner,
        members,
        tasks,
    })
}

async fn members(state: &AppState, project_id: Uuid) -> Result<Vec<UserProfile>, AppError> {
    Ok(sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users \
         WHERE id IN (SELECT user_id FROM project_members WHERE project_id = $1) \
         ORDER BY name",
        PROFILE_COLUMNS
    ))
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?)
}

async fn member_ids(state: &AppState, project_id: Uuid) -> Result<Vec<Uuid>, AppError> {
    Ok(
        sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .fetch_all(&state.pool)
            .await?,
    )
}

/// Partial update by a manager who owns the project, or an admin. Progress is taken from the
/// input when given, otherwise recomputed from the project's tasks. Every member is notified.
pub async fn update(
    state: &AppState,
    actor: &Claims,
    id: Uuid,
    input: UpdateProjectInput,
) -> Result<ProjectDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    input.validate()?;
    let current = find(state, id).await?;
    require_owner_or_admin(actor, current.owner_id, "update this project")?;

    let progress = match input.progress {
        Some(progress) => progress,
        None => {
            let statuses: Vec<Status> =
                sqlx::query_scalar("SELECT status FROM tasks WHERE project_id = $1")
                    .bind(id)
                    .fetch_all(&state.pool)
                    .await?;
            calculate_progress(&statuses)
        }
    };

    let project = sqlx::query_as::<_, Project>(&format!(
        "UPDATE projects SET \
            name = COALESCE($2, name), \
            description = COALESCE($3, description), \
            status = COALESCE($4, status), \
            start_date = COALESCE($5, start_date), \
            end_date = COALESCE($6, end_date), \
            progress = $7, \
            updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        PROJECT_COLUMNS
    ))
    .bind(id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.status)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(progress)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    let members = member_ids(state, id).await?;
    for member in &members {
        let new = NewNotification::new(
            NotificationType::System,
            "Project Updated",
            format!("Project \"{}\" has been updated", project.name),
        )
        .with_data(json!({ "projectId": id }));
        notifications::send(state, *member, new).await;
    }

    invalidate(state, id, &members).await?;
    state.search.index_project(&project).await;
    load_details(state, project).await
}

/// Deletes the project with its tasks. Members are told, the tasks leave the priority queue
/// and the search index.
pub async fn delete(
    state: &AppState,
    actor: &Claims,
    id: Uuid,
) -> Result<MessageResponse, AppError> {
    let project = find(state, id).await?;
    require_owner_or_admin(actor, project.owner_id, "delete this project")?;

    let members = member_ids(state, id).await?;
    let tasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE project_id = $1",
        TASK_COLUMNS
    ))
    .bind(id)
    .fetch_all(&state.pool)
    .await?;

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    for member in &members {
        let new = NewNotification::new(
            NotificationType::System,
            "Project Deleted",
            format!("Project \"{}\" has been deleted", project.name),
        )
        .with_data(json!({ "projectId": id }));
        notifications::send(state, *member, new).await;
    }

    let mut stale = vec![keys::TASKS_ALL.to_string(), keys::project_tasks(id)];
    for task in &tasks {
        stale.push(keys::task(task.id));
        stale.push(keys::task_comments(task.id));
        if let Some(assignee) = task.assignee_id {
            stale.push(keys::user_tasks(assignee));
        }
        if let Err(e) = state.priority.remove(task.id).await {
            log::warn!("failed to dequeue task {}: {}", task.id, e);
        }
        state.search.remove(DocumentKind::Task, task.id).await;
    }
    state.cache.del(&stale).await?;
    invalidate(state, id, &members).await?;
    state.search.remove(DocumentKind::Project, id).await;

    Ok(MessageResponse::new("Project deleted successfully"))
}

/// Adds `user_id` to the project. Managers only, and only the owner or an admin.
pub async fn add_member(
    state: &AppState,
    actor: &Claims,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    let project = find(state, project_id).await?;
    require_owner_or_admin(actor, project.owner_id, "manage members")?;

    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    if !user_exists {
        return Err(AppError::NotFound(format!("User with ID {} not found", user_id)));
    }

    let members = member_ids(state, project_id).await?;
    if members.contains(&user_id) {
        return Err(AppError::Forbidden(
            "User is already a member of this project".into(),
        ));
    }

    sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
        .bind(project_id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    let new = NewNotification::new(
        NotificationType::ProjectInvitation,
        "Project Invitation",
        format!("You have been added to project: {}", project.name),
    )
    .with_data(json!({ "projectId": project_id }));
    notifications::send(state, user_id, new).await;

    invalidate(state, project_id, &[user_id]).await?;
    load_details(state, project).await
}

/// Removes a member. The owner cannot be removed.
pub async fn remove_member(
    state: &AppState,
    actor: &Claims,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<ProjectDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    let project = find(state, project_id).await?;
    require_owner_or_admin(actor, project.owner_id, "manage members")?;

    let members = member_ids(state, project_id).await?;
    if !members.contains(&user_id) {
        return Err(AppError::Forbidden(
            "User is not a member of this project".into(),
        ));
    }
    if project.owner_id == user_id {
        return Err(AppError::Forbidden("Cannot remove project owner".into()));
    }

    sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    let new = NewNotification::new(
        NotificationType::ProjectRoleChanged,
        "Project Removal",
        format!("You have been removed from project: {}", project.name),
    )
    .with_data(json!({ "projectId": project_id }));
    notifications::send(state, user_id, new).await;

    invalidate(state, project_id, &[user_id]).await?;
    load_details(state, project).await
}

/// Drops the project, the global listing, and the per-user listings of `users`.
async fn invalidate(state: &AppState, project_id: Uuid, users: &[Uuid]) -> Result<(), AppError> {
    let mut stale = vec![keys::project(project_id), keys::PROJECTS_ALL.to_string()];
    stale.extend(users.iter().map(|user| keys::user_projects(*user)));
    stale.extend(users.iter().map(|user| keys::user(*user)));
    state.cache.del(&stale).await
}
