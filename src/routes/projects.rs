use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{CreateProjectInput, UpdateProjectInput},
    services,
    state::AppState,
};
use actix_web::{delete, get, patch, post, web, HttpResponse, Responder};
use uuid::Uuid;

/// Creates a project owned by the caller.
///
/// ## Responses:
/// - `201 Created`: The project with owner, members and tasks.
/// - `403 Forbidden`: The caller is neither `ADMIN` nor `PROJECT_MANAGER`.
/// - `422 Unprocessable Entity`: Invalid name, description or dates.
#[post("")]
pub async fn create_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    input: web::Json<CreateProjectInput>,
) -> Result<impl Responder, AppError> {
    let project = services::projects::create(&state, &user.0, input.into_inner()).await?;
    Ok(HttpResponse::Created().json(project))
}

#[get("")]
pub async fn list_projects(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let projects = services::projects::list(&state).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// Projects the caller owns or is a member of.
#[get("/my-projects")]
pub async fn my_projects(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let projects = services::projects::for_user(&state, user.id()).await?;
    Ok(HttpResponse::Ok().json(projects))
}

#[get("/{id}")]
pub async fn get_project(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let project = services::projects::get(&state, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Updates a project. `ADMIN`, or a `PROJECT_MANAGER` who owns it; every member is notified.
///
/// ## Responses:
/// - `200 OK`: The updated project.
/// - `403 Forbidden`: The caller is not a manager, or neither owns the project nor is an admin.
/// - `404 Not Found`: No such project.
#[patch("/{id}")]
pub async fn update_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
    input: web::Json<UpdateProjectInput>,
) -> Result<impl Responder, AppError> {
    let project =
        services::projects::update(&state, &user.0, id.into_inner(), input.into_inner()).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Deletes a project and its tasks. Owner or `ADMIN` only.
#[delete("/{id}")]
pub async fn delete_project(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let message = services::projects::delete(&state, &user.0, id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(message))
}

/// Adds a member to the project.
///
/// ## Responses:
/// - `200 OK`: The project with the new member.
/// - `403 Forbidden`: Missing role, not owner/admin, or the user is already a member.
/// - `404 Not Found`: Unknown project or user.
#[post("/{id}/members/{user_id}")]
pub async fn add_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (project_id, member_id) = path.into_inner();
    let project = services::projects::add_member(&state, &user.0, project_id, member_id).await?;
    Ok(HttpResponse::Ok().json(project))
}

/// Removes a member from the project. The owner cannot be removed.
#[delete("/{id}/members/{user_id}")]
pub async fn remove_member(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<impl Responder, AppError> {
    let (project_id, member_id) = path.into_inner();
    let project =
        services::projects::remove_member(&state, &user.0, project_id, member_id).await?;
    Ok(HttpResponse::Ok().json(project))
}
