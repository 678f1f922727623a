use crate::{auth::AuthenticatedUser, error::AppError, notifications, state::AppState};
use actix_web::{delete, get, patch, web, HttpResponse, Responder};
use uuid::Uuid;

/// The caller's notifications, newest first.
#[get("")]
pub async fn list_notifications(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let notifications = notifications::find_all(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

#[patch("/read-all")]
pub async fn mark_all_as_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let message = notifications::mark_all_as_read(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(message))
}

/// Marks one of the caller's notifications as read.
///
/// ## Responses:
/// - `200 OK`: The updated notification.
/// - `404 Not Found`: No such notification for this user.
#[patch("/{id}/read")]
pub async fn mark_as_read(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let notification = notifications::mark_as_read(&state, id.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(notification))
}

#[delete("/{id}")]
pub async fn delete_notification(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let message = notifications::delete(&state, id.into_inner(), user.id()).await?;
    Ok(HttpResponse::Ok().json(message))
}
