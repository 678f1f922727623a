use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateUserInput, UpdateUserInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Lists every user.
///
/// ## Responses:
/// - `200 OK`: JSON array of user profiles.
/// - `403 Forbidden`: The caller is neither `ADMIN` nor `PROJECT_MANAGER`.
#[get("")]
pub async fn list_users(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let users = services::users::list(&state, &user.0).await?;
    Ok(HttpResponse::Ok().json(users))
}

/// Profile of the caller, with the ids of their projects and assigned tasks.
#[get("/me")]
pub async fn me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let details = services::users::get(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Updates the caller's own profile. `role` and `isActive` require `ADMIN`.
#[patch("/me")]
pub async fn update_me(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<UpdateUserInput>,
) -> Result<impl Responder, AppError> {
    let profile = services::users::update(&state, &user.0, user.id(), input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Retrieves a user by id.
///
/// ## Responses:
/// - `200 OK`: The user with `projectIds` and `taskIds`.
/// - `404 Not Found`: No such user.
#[get("/{id}")]
pub async fn get_user(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let details = services::users::get(&state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(details))
}

/// Creates a user with any role. `ADMIN` only.
///
/// ## Responses:
/// - `201 Created`: The new profile.
/// - `403 Forbidden`: The caller is not an admin.
/// - `409 Conflict`: The email is already registered.
#[post("")]
pub async fn create_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<CreateUserInput>,
) -> Result<impl Responder, AppError> {
    let profile = services::users::create(&state, &user.0, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(profile))
}

/// Updates a user. Allowed for the user themselves or an admin.
#[patch("/{id}")]
pub async fn update_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    input: web::Json<UpdateUserInput>,
) -> Result<impl Responder, AppError> {
    let profile =
        services::users::update(&state, &user.0, id.into_inner(), input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Deletes a user. `ADMIN` only.
#[delete("/{id}")]
pub async fn delete_user(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let message = services::users::delete(&state, &user.0, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}
