use crate::{
    auth::{LoginRequest, RefreshRequest},
    error::AppError,
    models::CreateUserInput,
    services,
    state::AppState,
};
use actix_web::{post, web, HttpResponse, Responder};

/// Register a new user
///
/// Creates a `USER` account and returns an access/refresh token pair with the profile.
///
/// ## Responses:
/// - `201 Created`: `AuthResponse` JSON.
/// - `409 Conflict`: The email is already registered.
/// - `422 Unprocessable Entity`: Invalid email, name or weak password.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<CreateUserInput>,
) -> Result<impl Responder, AppError> {
    let response = services::auth::register(&state, register_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(response))
}

/// Login user
///
/// Authenticates a user by email and password.
///
/// ## Responses:
/// - `200 OK`: `AuthResponse` JSON.
/// - `401 Unauthorized`: Unknown email or wrong password.
/// - `403 Forbidden`: The account is deactivated.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = services::auth::login(&state, login_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Exchanges a refresh token for a new token pair.
#[post("/refresh")]
pub async fn refresh(
    state: web::Data<AppState>,
    request: web::Json<RefreshRequest>,
) -> Result<impl Responder, AppError> {
    let response = services::auth::refresh(&state, request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::tests::test_state;
    use actix_web::{test, App};
    use serde_json::json;

    #[actix_rt::test]
    async fn test_login_validation_happens_before_any_query() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .service(login),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "invalid-email", "password": "password123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 422);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({ "email": "test@example.com", "password": "short" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
    }

    #[actix_rt::test]
    async fn test_register_rejects_weak_password() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .service(register),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({ "name": "Test", "email": "test@example.com", "password": "weak" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 422);
    }

    #[actix_rt::test]
    async fn test_refresh_rejects_garbage_token() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .service(refresh),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/refresh")
            .set_json(json!({ "refreshToken": "not-a-jwt" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 401);
    }
}
