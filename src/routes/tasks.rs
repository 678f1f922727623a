use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateTaskInput, UpdateTaskInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Creates a new task.
///
/// New tasks start as `TODO` with `MEDIUM` priority unless one is given, and enter the
/// priority queue. The assignee, if any, is notified.
///
/// ## Request Body:
/// - `title`: 1 to 200 characters (required).
/// - `projectId`: The owning project (required).
/// - `description`, `assigneeId`, `parentTaskId`, `priority`, `dueDate` (optional).
///
/// ## Responses:
/// - `201 Created`: The task with its relations.
/// - `403 Forbidden`: The caller is neither `ADMIN` nor `PROJECT_MANAGER`.
/// - `404 Not Found`: The project or parent task does not exist.
/// - `422 Unprocessable Entity`: Input validation failed.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<CreateTaskInput>,
) -> Result<impl Responder, AppError> {
    let task = services::tasks::create(&state, &user.0, task_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves every task, newest first. `ADMIN` or `PROJECT_MANAGER` only.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::list(&state, &user.0).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Tasks assigned to the caller.
#[get("/my-tasks")]
pub async fn my_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::for_assignee(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

#[get("/project/{project_id}")]
pub async fn project_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    project_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let tasks = services::tasks::for_project(&state, &user.0, project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves a task with its project, assignee, creator, parent and subtasks.
///
/// ## Responses:
/// - `200 OK`: The task as JSON.
/// - `404 Not Found`: No task with the given id.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = services::tasks::get(&state, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Partially updates a task. Absent fields keep their value.
///
/// A status change notifies the assignee and is broadcast to the task's room;
/// a new assignee is notified of the assignment.
///
/// ## Responses:
/// - `200 OK`: The updated task.
/// - `400 Bad Request`: The task was made its own parent.
/// - `403 Forbidden`: The caller is neither `ADMIN` nor `PROJECT_MANAGER`.
/// - `404 Not Found`: The task or the new parent does not exist.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
    task_data: web::Json<UpdateTaskInput>,
) -> Result<impl Responder, AppError> {
    let task = services::tasks::update(&state, &user.0, task_id.into_inner(), task_data.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task by its id. `ADMIN` only.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let message = services::tasks::delete(&state, &user.0, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}
