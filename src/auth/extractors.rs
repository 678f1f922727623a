use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

use crate::auth::Claims;
use crate::error::AppError;
use crate::models::Role;

/// The caller of a route protected by `AuthMiddleware`, taken from the request extensions.
///
/// Missing claims mean the middleware did not run for this route, which is reported as
/// `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        self.0.role == Role::Admin
    }

    /// Fails with `403 Forbidden` unless the caller has one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        require_role(&self.0, allowed)
    }

    /// Fails with `403 Forbidden` unless the caller is `owner_id` or an admin.
    pub fn require_owner_or_admin(&self, owner_id: Uuid, action: &str) -> Result<(), AppError> {
        require_owner_or_admin(&self.0, owner_id, action)
    }
}

/// Role check shared by the REST extractor and the GraphQL resolvers.
pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&claims.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient permissions".into()))
    }
}

pub fn require_owner_or_admin(
    claims: &Claims,
    owner_id: Uuid,
    action: &str,
) -> Result<(), AppError> {
    if claims.role == Role::Admin || claims.sub == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the owner or an admin can {}",
            action
        )))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(AuthenticatedUser(claims))),
            None => {
                let err = AppError::Unauthorized(
                    "User not found in request. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}
