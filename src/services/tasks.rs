use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_role, Claims};
use crate::cache::keys;
use crate::error::AppError;
use crate::events::TaskEvent;
use crate::models::task::TASK_COLUMNS;
use crate::models::user::PROFILE_COLUMNS;
use crate::models::{
    CreateTaskInput, MessageResponse, NewNotification, NotificationType, Role, Task, TaskDetails,
    UpdateTaskInput, UserProfile,
};
use crate::notifications;
use crate::search::DocumentKind;
use crate::services::projects;
use crate::state::AppState;

const MANAGERS: [Role; 2] = [Role::Admin, Role::ProjectManager];

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Task with ID {} not found", id))
}

fn assigned(task: &Task) -> NewNotification {
    NewNotification::new(
        NotificationType::TaskAssigned,
        "Task Assigned",
        format!("You have been assigned to task: {}", task.title),
    )
    .with_data(json!({ "taskId": task.id }))
}

/// Creates a `TODO` task in an existing project and queues it by priority.
pub async fn create(
    state: &AppState,
    actor: &Claims,
    input: CreateTaskInput,
) -> Result<TaskDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    input.validate()?;
    projects::find(state, input.project_id).await?;
    if let Some(parent_id) = input.parent_task_id {
        find(state, parent_id).await?;
    }

    let draft = Task::new(input, actor.sub);
    let task = sqlx::query_as::<_, Task>(&format!(
        "INSERT INTO tasks (id, title, description, status, priority, due_date, project_id, \
                            assignee_id, creator_id, parent_task_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(draft.id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.status)
    .bind(draft.priority)
    .bind(draft.due_date)
    .bind(draft.project_id)
    .bind(draft.assignee_id)
    .bind(draft.creator_id)
    .bind(draft.parent_task_id)
    .fetch_one(&state.pool)
    .await?;

    invalidate(state, &task, None).await?;
    if let Err(e) = state.priority.add(&task).await {
        log::warn!("failed to queue task {}: {}", task.id, e);
    }
    state.search.index_task(&task).await;

    if let Some(assignee) = task.assignee_id {
        notifications::send(state, assignee, assigned(&task)).await;
    }
    load_details(state, task).await
}

pub async fn list(state: &AppState, actor: &Claims) -> Result<Vec<Task>, AppError> {
    require_role(actor, &MANAGERS)?;
    state
        .cache
        .remember(keys::TASKS_ALL, async {
            let tasks = sqlx::query_as::<_, Task>(&format!(
                "SELECT {} FROM tasks ORDER BY created_at DESC",
                TASK_COLUMNS
            ))
            .fetch_all(&state.pool)
            .await?;
            Ok(tasks)
        })
        .await
}

pub async fn for_assignee(state: &AppState, assignee_id: Uuid) -> Result<Vec<Task>, AppError> {
    state
        .cache
        .remember(&keys::user_tasks(assignee_id), async {
            let tasks = sqlx::query_as::<_, Task>(&format!(
                "SELECT {} FROM tasks WHERE assignee_id = $1 ORDER BY created_at DESC",
                TASK_COLUMNS
            ))
            .bind(assignee_id)
            .fetch_all(&state.pool)
            .await?;
            Ok(tasks)
        })
        .await
}

pub async fn for_project(
    state: &AppState,
    actor: &Claims,
    project_id: Uuid,
) -> Result<Vec<Task>, AppError> {
    require_role(actor, &MANAGERS)?;
    state
        .cache
        .remember(&keys::project_tasks(project_id), async {
            let tasks = sqlx::query_as::<_, Task>(&format!(
                "SELECT {} FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
                TASK_COLUMNS
            ))
            .bind(project_id)
            .fetch_all(&state.pool)
            .await?;
            Ok(tasks)
        })
        .await
}

pub async fn get(state: &AppState, id: Uuid) -> Result<TaskDetails, AppError> {
    state
        .cache
        .remember(&keys::task(id), async {
            let task = find(state, id).await?;
            load_details(state, task).await
        })
        .await
}

/// Uncached task row.
pub async fn find(state: &AppState, id: Uuid) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>(&format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS))
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| not_found(id))
}

async fn find_profile(state: &AppState, id: Option<Uuid>) -> Result<Option<UserProfile>, AppError> {
    let Some(id) = id else {
        return Ok(None);
    };
    Ok(sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {} FROM users WHERE id = $1",
        PROFILE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?)
}

async fn load_details(state: &AppState, task: Task) -> Result<TaskDetails, AppError> {
    let project = projects::find(state, task.project_id).await.ok();
    let assignee = find_profile(state, task.assignee_id).await?;
    let creator = find_profile(state, Some(task.creator_id)).await?;
    let parent_task = match task.parent_task_id {
        Some(parent_id) => find(state, parent_id).await.ok(),
        None => None,
    };
    let subtasks = sqlx::query_as::<_, Task>(&format!(
        "SELECT {} FROM tasks WHERE parent_task_id = $1 ORDER BY created_at",
        TASK_COLUMNS
    ))
    .bind(task.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(TaskDetails {
        task,
        project,
        assignee,
        creator,
        parent_task,
        subtasks,
    })
}

/// Partial update. A status change notifies the assignee and is published to the task's
/// room; a new assignee is notified of the assignment.
pub async fn update(
    state: &AppState,
    actor: &Claims,
    id: Uuid,
    input: UpdateTaskInput,
) -> Result<TaskDetails, AppError> {
    require_role(actor, &MANAGERS)?;
    input.validate()?;
    if input.parent_task_id == Some(id) {
        return Err(AppError::BadRequest("A task cannot be its own parent".into()));
    }
    let current = find(state, id).await?;
    if let Some(parent_id) = input.parent_task_id {
        find(state, parent_id).await?;
    }

    let task = sqlx::query_as::<_, Task>(&format!(
        "UPDATE tasks SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            status = COALESCE($4, status), \
            priority = COALESCE($5, priority), \
            assignee_id = COALESCE($6, assignee_id), \
            parent_task_id = COALESCE($7, parent_task_id), \
            due_date = COALESCE($8, due_date), \
            updated_at = NOW() \
         WHERE id = $1 RETURNING {}",
        TASK_COLUMNS
    ))
    .bind(id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.status)
    .bind(input.priority)
    .bind(input.assignee_id)
    .bind(input.parent_task_id)
    .bind(input.due_date)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    invalidate(state, &task, Some(&current)).await?;
    if let Err(e) = state.priority.update(&task).await {
        log::warn!("failed to re-score task {}: {}", task.id, e);
    }
    state.search.index_task(&task).await;

    if let Some(status) = input.status.filter(|status| *status != current.status) {
        if let Some(assignee) = current.assignee_id {
            let new = NewNotification::new(
                NotificationType::TaskStatusChanged,
                "Task Status Updated",
                format!("Task \"{}\" status changed to {}", current.title, status),
            )
            .with_data(json!({ "taskId": id }));
            notifications::send(state, assignee, new).await;
        }
        state.events.publish(TaskEvent::StatusChanged {
            task_id: id,
            title: task.title.clone(),
            old_status: current.status,
            new_status: status,
            changed_by: actor.sub,
        });
    }

    if let Some(assignee) = input.assignee_id.filter(|a| Some(*a) != current.assignee_id) {
        notifications::send(state, assignee, assigned(&task)).await;
    }

    load_details(state, task).await
}

/// Admin-only. The assignee is told the task is gone.
pub async fn delete(state: &AppState, actor: &Claims, id: Uuid) -> Result<MessageResponse, AppError> {
    require_role(actor, &[Role::Admin])?;
    let task = find(state, id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    invalidate(state, &task, None).await?;
    state.cache.del(&[keys::task_comments(id)]).await?;
    if let Err(e) = state.priority.remove(id).await {
        log::warn!("failed to dequeue task {}: {}", id, e);
    }
    state.search.remove(DocumentKind::Task, id).await;

    if let Some(assignee) = task.assignee_id {
        let new = NewNotification::new(
            NotificationType::System,
            "Task Deleted",
            format!("Task \"{}\" has been deleted", task.title),
        )
        .with_data(json!({ "taskId": id }));
        notifications::send(state, assignee, new).await;
    }

    Ok(MessageResponse::new("Task deleted successfully"))
}

/// Every key a task shows up in: itself, its parent (subtask list), and the listings of its
/// project and assignee, before and after the change.
async fn invalidate(
    state: &AppState,
    task: &Task,
    previous: Option<&Task>,
) -> Result<(), AppError> {
    let mut stale = vec![
        keys::task(task.id),
        keys::TASKS_ALL.to_string(),
        keys::project_tasks(task.project_id),
        keys::project(task.project_id),
    ];
    let previous_parent = previous.and_then(|p| p.parent_task_id);
    for parent in [task.parent_task_id, previous_parent].into_iter().flatten() {
        stale.push(keys::task(parent));
    }
    let previous_assignee = previous.and_then(|p| p.assignee_id);
    for assignee in [task.assignee_id, previous_assignee].into_iter().flatten() {
        stale.push(keys::user_tasks(assignee));
        stale.push(keys::user(assignee));
    }
    state.cache.del(&stale).await
}
