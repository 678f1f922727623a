pub mod auth;
pub mod comments;
pub mod health;
pub mod notifications;
pub mod projects;
pub mod search;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Mounts the REST API. Called inside the `/api` scope, behind the rate limiter and
/// `AuthMiddleware`. Literal segments (`/me`, `/my-tasks`, ...) are registered before
/// their `/{id}` siblings so they are matched first.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(auth::login)
            .service(auth::register)
            .service(auth::refresh),
    )
    .service(
        web::scope("/users")
            .service(users::list_users)
            .service(users::create_user)
            .service(users::me)
            .service(users::update_me)
            .service(users::get_user)
            .service(users::update_user)
            .service(users::delete_user),
    )
    .service(
        web::scope("/projects")
            .service(projects::list_projects)
            .service(projects::create_project)
            .service(projects::my_projects)
            .service(projects::add_member)
            .service(projects::remove_member)
            .service(projects::get_project)
            .service(projects::update_project)
            .service(projects::delete_project),
    )
    .service(
        web::scope("/tasks")
            .service(tasks::get_tasks)
            .service(tasks::create_task)
            .service(tasks::my_tasks)
            .service(tasks::project_tasks)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(
        web::scope("/comments")
            .service(comments::list_comments)
            .service(comments::create_comment)
            .service(comments::task_comments)
            .service(comments::get_comment)
            .service(comments::update_comment)
            .service(comments::delete_comment),
    )
    .service(
        web::scope("/notifications")
            .service(notifications::list_notifications)
            .service(notifications::mark_all_as_read)
            .service(notifications::mark_as_read)
            .service(notifications::delete_notification),
    )
    .service(
        web::scope("/search")
            .service(search::search)
            .service(search::priority_queue)
            .service(search::queue_position),
    );
}
