use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::models::{Role, UserProfile};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Represents the claims encoded within a JWT (JSON Web Token).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject of the token: the user's id.
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub kind: TokenKind,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: usize,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Secrets and lifetimes for access and refresh tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Token pair handed out on login, registration and refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl JwtConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            refresh_secret: config.jwt_refresh_secret.clone(),
            access_ttl: Duration::hours(config.jwt_expiration_hours),
            refresh_ttl: Duration::days(config.jwt_refresh_expiration_days),
        }
    }

    pub fn issue(&self, user: &UserProfile) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: generate_token(user, TokenKind::Access, &self.secret, self.access_ttl)?,
            refresh_token: generate_token(
                user,
                TokenKind::Refresh,
                &self.refresh_secret,
                self.refresh_ttl,
            )?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        verify_token(token, &self.secret, TokenKind::Access)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims, AppError> {
        verify_token(token, &self.refresh_secret, TokenKind::Refresh)
    }
}

/// Signs a token of the given kind for `user`, valid for `ttl`.
pub fn generate_token(
    user: &UserProfile,
    kind: TokenKind,
    secret: &str,
    ttl: Duration,
) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::InternalServerError("Token lifetime overflow".into()))?;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        kind,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies signature and expiry, and that the token is of the `expected` kind.
pub fn verify_token(token: &str, secret: &str, expected: TokenKind) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)?;

    if claims.kind != expected {
        return Err(AppError::Unauthorized("Invalid token: wrong token type".into()));
    }
    Ok(claims)
}
