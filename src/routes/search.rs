use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::Role,
    search::SearchQuery,
    state::AppState,
};
use actix_web::{get, web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const DEFAULT_QUEUE_LIMIT: usize = 10;

/// Full-text search over tasks and projects.
///
/// ## Query Parameters:
/// - `q`: Search term, matched against titles and descriptions.
/// - `type` (optional): `task` or `project`.
/// - `status`, `priority`, `projectId`, `assigneeId` (optional): Exact-match filters.
/// - `limit` (optional): Defaults to 20, capped at 100.
///
/// ## Responses:
/// - `200 OK`: JSON array of `{ id, score, ...document }`.
#[get("")]
pub async fn search(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<SearchQuery>,
) -> Result<impl Responder, AppError> {
    let hits = state.search.search(&state.pool, &query).await?;
    Ok(HttpResponse::Ok().json(hits))
}

#[derive(Debug, Deserialize)]
pub struct QueueQuery {
    pub limit: Option<usize>,
}

/// Ids of the highest-scoring open tasks. `ADMIN` or `PROJECT_MANAGER` only.
///
/// ## Query Parameters:
/// - `limit` (optional): Defaults to 10, capped at 100.
#[get("/priority-queue")]
pub async fn priority_queue(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<QueueQuery>,
) -> Result<impl Responder, AppError> {
    user.require_role(&[Role::Admin, Role::ProjectManager])?;
    let ids = state
        .priority
        .next(query.limit.unwrap_or(DEFAULT_QUEUE_LIMIT))
        .await?;
    Ok(HttpResponse::Ok().json(ids))
}

/// Zero-based rank of a task in the priority queue, `-1` when it is not queued.
#[get("/priority-queue/position/{task_id}")]
pub async fn queue_position(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let position = state.priority.position(task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "position": position })))
}
