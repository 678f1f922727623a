use validator::Validate;

use crate::auth::{verify_password, AuthResponse, LoginRequest, RefreshRequest};
use crate::error::AppError;
use crate::models::{CreateUserInput, Role, UserProfile};
use crate::services::users;
use crate::state::AppState;

/// Self-registration always creates a plain `USER`; other roles are granted by an admin.
pub async fn register(state: &AppState, input: CreateUserInput) -> Result<AuthResponse, AppError> {
    let input = CreateUserInput {
        role: Some(Role::User),
        ..input
    };
    let user = users::insert(state, input).await?;
    log::info!("registered user {}", user.id);
    issue(state, user)
}

pub async fn login(state: &AppState, credentials: LoginRequest) -> Result<AuthResponse, AppError> {
    credentials.validate()?;
    let record = users::find_record_by_email(state, &credentials.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&credentials.password, &record.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }
    if !record.is_active {
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }
    issue(state, record.into())
}

/// Trades a valid refresh token for a fresh pair. The user must still exist and be active.
pub async fn refresh(state: &AppState, request: RefreshRequest) -> Result<AuthResponse, AppError> {
    request.validate()?;
    let claims = state.jwt.verify_refresh(&request.refresh_token)?;
    let user = users::find_profile(state, claims.sub)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::Unauthorized("Invalid refresh token".into()),
            other => other,
        })?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".into()));
    }
    issue(state, user)
}

fn issue(state: &AppState, user: UserProfile) -> Result<AuthResponse, AppError> {
    let tokens = state.jwt.issue(&user)?;
    Ok(AuthResponse::new(tokens, user))
}
