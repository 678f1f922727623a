use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_owner_or_admin, require_role, Claims};
use crate::cache::keys;
use crate::error::AppError;
use crate::models::comment::COMMENT_COLUMNS;
use crate::models::{
    Comment, CreateCommentInput, MessageResponse, Role, UpdateCommentInput,
};
use crate::notifications;
use crate::services::tasks;
use crate::state::AppState;

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Comment with ID {} not found", id))
}

/// Comments on an existing task. The task's assignee and creator hear about it.
pub async fn create(
    state: &AppState,
    actor: &Claims,
    input: CreateCommentInput,
) -> Result<Comment, AppError> {
    input.validate()?;
    let task = tasks::find(state, input.task_id).await?;

    let comment = sqlx::query_as::<_, Comment>(&format!(
        "INSERT INTO comments (id, content, task_id, user_id) VALUES ($1, $2, $3, $4) RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(&input.content)
    .bind(task.id)
    .bind(actor.sub)
    .fetch_one(&state.pool)
    .await?;

    invalidate(state, &comment).await?;
    notifications::notify_new_comment(state, &task, &comment).await;
    Ok(comment)
}

/// Every comment. Admins and project managers only.
pub async fn list(state: &AppState, actor: &Claims) -> Result<Vec<Comment>, AppError> {
    require_role(actor, &[Role::Admin, Role::ProjectManager])?;
    state
        .cache
        .remember(keys::COMMENTS_ALL, async {
            let comments = sqlx::query_as::<_, Comment>(&format!(
                "SELECT {} FROM comments ORDER BY created_at DESC",
                COMMENT_COLUMNS
            ))
            .fetch_all(&state.pool)
            .await?;
            Ok(comments)
        })
        .await
}

/// Comments on a task, newest first.
pub async fn for_task(state: &AppState, task_id: Uuid) -> Result<Vec<Comment>, AppError> {
    state
        .cache
        .remember(&keys::task_comments(task_id), async {
            let comments = sqlx::query_as::<_, Comment>(&format!(
                "SELECT {} FROM comments WHERE task_id = $1 ORDER BY created_at DESC",
                COMMENT_COLUMNS
            ))
            .bind(task_id)
            .fetch_all(&state.pool)
            .await?;
            Ok(comments)
        })
        .await
}

pub async fn get(state: &AppState, id: Uuid) -> Result<Comment, AppError> {
    state
        .cache
        .remember(&keys::comment(id), find(state, id))
        .await
}

async fn find(state: &AppState, id: Uuid) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments WHERE id = $1",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))
}

pub async fn update(
    state: &AppState,
    actor: &Claims,
    id: Uuid,
    input: UpdateCommentInput,
) -> Result<Comment, AppError> {
    input.validate()?;
    let current = find(state, id).await?;
    require_owner_or_admin(actor, current.user_id, "edit this comment")?;

    let comment = sqlx::query_as::<_, Comment>(&format!(
        "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
        COMMENT_COLUMNS
    ))
    .bind(id)
    .bind(&input.content)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| not_found(id))?;

    invalidate(state, &comment).await?;
    Ok(comment)
}

pub async fn delete(state: &AppState, actor: &Claims, id: Uuid) -> Result<MessageResponse, AppError> {
    let comment = find(state, id).await?;
    require_owner_or_admin(actor, comment.user_id, "delete this comment")?;

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(id)
        .execute(&state.pool)
        .await?;

    invalidate(state, &comment).await?;
    Ok(MessageResponse::new("Comment deleted successfully"))
}

async fn invalidate(state: &AppState, comment: &Comment) -> Result<(), AppError> {
    state
        .cache
        .del(&[
            keys::comment(comment.id),
            keys::task_comments(comment.task_id),
            keys::COMMENTS_ALL.to_string(),
        ])
        .await
}
