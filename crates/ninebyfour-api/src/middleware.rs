use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use tracing::debug;

use ninebyfour_types::api::Claims;
use ninebyfour_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the JWT from the Authorization header, then expose
/// the claims to handlers as an `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Unauthorized("Authentication token required.".into()))?;

    let claims = verify_token(&state.jwt_secret, bearer.token())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let is_admin = req
        .extensions()
        .get::<Claims>()
        .is_some_and(|claims| claims.role == Role::Admin);

    if !is_admin {
        return Err(ApiError::Forbidden("Admin access required".into()));
    }
    Ok(next.run(req).await)
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("JWT verification failed: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => {
                ApiError::Unauthorized("Authentication token expired.".into())
            }
            _ => ApiError::Forbidden("Invalid Authentication token.".into()),
        }
    })
}
