use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateCommentInput, UpdateCommentInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Comments on a task as the caller.
///
/// ## Responses:
/// - `201 Created`: The comment.
/// - `404 Not Found`: The task does not exist.
/// - `422 Unprocessable Entity`: Empty or oversized content.
#[post("")]
pub async fn create_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<CreateCommentInput>,
) -> Result<impl Responder, AppError> {
    let comment = services::comments::create(&state, &user.0, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(comment))
}

#[get("")]
pub async fn list_comments(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let comments = services::comments::list(&state, &user.0).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// Comments on a task, newest first.
#[get("/task/{task_id}")]
pub async fn task_comments(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let comments = services::comments::for_task(&state, task_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comments))
}

#[get("/{id}")]
pub async fn get_comment(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let comment = services::comments::get(&state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// Edits a comment. Author or `ADMIN` only.
#[patch("/{id}")]
pub async fn update_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    input: web::Json<UpdateCommentInput>,
) -> Result<impl Responder, AppError> {
    let comment =
        services::comments::update(&state, &user.0, id.into_inner(), input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(comment))
}

/// Deletes a comment. Author or `ADMIN` only.
#[delete("/{id}")]
pub async fn delete_comment(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let message = services::comments::delete(&state, &user.0, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}
