use std::sync::Arc;

use anyhow::Context;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use tracing::{info, warn};

use ninebyfour_db::Database;
use ninebyfour_db::users::NewUser;
use ninebyfour_types::api::{
    Claims, LoginRequest, LoginResponse, MessageBody, RegisterRequest, RegisterResponse,
    SessionUser,
};
use ninebyfour_types::models::Role;

use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
}

enum Registration {
    Created(i64),
    InviteRequired,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<Response> {
    let (Some(username), Some(password), Some(email)) = (
        non_blank(req.username),
        req.password.filter(|p| !p.is_empty()),
        non_blank(req.email),
    ) else {
        return Err(ApiError::BadRequest("Username, password, and email are required.".into()));
    };

    let name_len = username.chars().count();
    if !(3..=32).contains(&name_len) {
        return Err(ApiError::BadRequest("Username must be between 3 and 32 characters.".into()));
    }
    if password.len() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters.".into()));
    }

    let invite_code = non_blank(req.invite_code);
    let response_name = username.clone();

    let outcome = db_call(&state, move |db| {
        let waitlist_active = db.is_waitlist_enabled().unwrap_or_else(|e| {
            warn!("Could not read waitlist setting, treating it as enabled: {}", e);
            true
        });

        if waitlist_active && invite_code.is_none() {
            return Ok(Registration::InviteRequired);
        }

        let password_hash = hash_password(&password)?;
        let new_user = NewUser {
            username: &username,
            password_hash: &password_hash,
            email: &email,
        };
        let gate = if waitlist_active { invite_code.as_deref() } else { None };
        let user_id = db.register_user(&new_user, gate)?;
        Ok(Registration::Created(user_id))
    })
    .await?;

    match outcome {
        Registration::InviteRequired => Ok((
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Registration is currently invite-only",
                "waitlist_enabled": true,
                "message": "Please join our waitlist to get an invite code",
            })),
        )
            .into_response()),
        Registration::Created(user_id) => {
            info!("Registered user {} ({})", response_name, user_id);
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "Creator account created successfully!".into(),
                    user_id,
                }),
            )
                .into_response())
        }
    }
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(username), Some(password)) = (
        non_blank(req.username),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest("Username and password are required.".into()));
    };

    let user = db_call(&state, move |db| {
        let user = db
            .get_user_by_username(&username)?
            .ok_or_else(invalid_credentials)?;

        let parsed_hash =
            PasswordHash::new(&user.password).map_err(|e| ApiError::Internal(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid_credentials())?;

        Ok(user)
    })
    .await?;

    let role: Role = user.role.parse().map_err(ApiError::Internal)?;
    let token = create_token(&state.jwt_secret, state.token_ttl, user.id, &user.username, role)?;

    Ok(Json(LoginResponse {
        token,
        user: SessionUser {
            id: user.id,
            username: user.username,
            role,
        },
    }))
}

/// DELETE /users/{user_id}: a user may delete themself; admins may delete anyone.
pub async fn delete_user(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    if claims.id != user_id && claims.role != Role::Admin {
        return Err(ApiError::Forbidden("You can only delete your own account".into()));
    }

    db_call(&state, move |db| Ok(db.delete_user(user_id)?)).await?;
    Ok(Json(MessageBody::new("Account deleted")))
}

pub fn create_token(
    secret: &str,
    ttl: chrono::Duration,
    user_id: i64,
    username: &str,
    role: Role,
) -> anyhow::Result<String> {
    let expires_at = (chrono::Utc::now() + ttl).timestamp();
    let exp = usize::try_from(expires_at).context("token expiry falls before the epoch")?;
    let claims = Claims {
        id: user_id,
        username: username.to_string(),
        role,
        exp,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Argon2id with a fresh random salt, as a PHC string.
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(e.to_string()))
}

fn invalid_credentials() -> ApiError {
    ApiError::Unauthorized("Invalid username or password.".into())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::verify_token;

    #[test]
    fn token_round_trips_claims() {
        let token = create_token("s3cret", chrono::Duration::hours(1), 7, "alice", Role::Admin)
            .unwrap();
        let claims = verify_token("s3cret", &token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn wrong_secret_is_forbidden_and_expired_is_unauthorized() {
        let token = create_token("s3cret", chrono::Duration::hours(1), 7, "alice", Role::User)
            .unwrap();
        let err = verify_token("other", &token).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        // Past the default 60s validation leeway
        let stale = create_token("s3cret", chrono::Duration::hours(-2), 7, "alice", Role::User)
            .unwrap();
        let err = verify_token("s3cret", &stale).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("correct horse").unwrap();
        let parsed = PasswordHash::new(&hash).unwrap();
        assert!(Argon2::default().verify_password(b"correct horse", &parsed).is_ok());
        assert!(Argon2::default().verify_password(b"wrong horse", &parsed).is_err());
    }

    #[test]
    fn blank_fields_are_missing() {
        assert_eq!(non_blank(Some("  ".into())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" bob ".into())).as_deref(), Some("bob"));
    }
}
