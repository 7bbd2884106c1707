use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use ninebyfour_db::models::JoinOutcome;
use ninebyfour_types::api::{
    ApproveResponse, Claims, JoinWaitlistRequest, JoinWaitlistResponse, MessageBody,
    RejectRequest, ToggleWaitlistRequest, ToggleWaitlistResponse, VerifyInviteRequest,
    VerifyInviteResponse,
};
use ninebyfour_types::models::{WaitlistEntry, WaitlistStatus};

use crate::auth::AppState;
use crate::convert;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam, QueryParams};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// A status name, or `all`.
    pub status: Option<String>,
}

/// 16 random bytes, hex encoded.
pub fn generate_invite_code() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// POST /waitlist/join (public)
pub async fn join(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<JoinWaitlistRequest>,
) -> ApiResult<Response> {
    let email = req
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Email is required".into()))?;
    let full_name = req.full_name.filter(|n| !n.trim().is_empty());

    let db_email = email.clone();
    let outcome = db_call(&state, move |db| {
        Ok(db.join_waitlist(&db_email, full_name.as_deref())?)
    })
    .await?;

    match outcome {
        JoinOutcome::AlreadyListed { status } => Ok((
            StatusCode::CONFLICT,
            Json(json!({ "error": "Email already on waitlist", "status": status })),
        )
            .into_response()),
        JoinOutcome::Added { waitlist_id } => {
            info!("Waitlist entry {} added", waitlist_id);
            Ok((
                StatusCode::CREATED,
                Json(JoinWaitlistResponse {
                    message: "Successfully added to waitlist! We will send you an invite code soon."
                        .into(),
                    email,
                }),
            )
                .into_response())
        }
    }
}

/// POST /waitlist/verify (public)
pub async fn verify(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<VerifyInviteRequest>,
) -> ApiResult<Json<VerifyInviteResponse>> {
    let code = req
        .invite_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Invite code required".into()))?;

    let email = db_call(&state, move |db| Ok(db.verify_invite(code.trim())?))
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid or expired invite code".into()))?;

    Ok(Json(VerifyInviteResponse { valid: true, email }))
}

/// GET /waitlist?status= (admin)
pub async fn list(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListQuery>,
) -> ApiResult<Json<Vec<WaitlistEntry>>> {
    let status = match query.status.as_deref() {
        None | Some("all") | Some("") => None,
        Some(raw) => Some(raw.parse::<WaitlistStatus>().map_err(ApiError::BadRequest)?),
    };

    let rows = db_call(&state, move |db| Ok(db.list_waitlist(status)?)).await?;
    Ok(Json(rows.into_iter().map(convert::waitlist_entry).collect()))
}

/// POST /waitlist/{waitlist_id}/approve (admin)
pub async fn approve(
    State(state): State<AppState>,
    PathParam(waitlist_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<ApproveResponse>> {
    let invite_code = generate_invite_code();

    let code = invite_code.clone();
    let row = db_call(&state, move |db| {
        Ok(db.approve_waitlist_entry(waitlist_id, claims.id, &code)?)
    })
    .await?;

    info!("Waitlist entry {} approved by {}", waitlist_id, claims.username);
    Ok(Json(ApproveResponse {
        message: "User approved".into(),
        invite_code,
        entry: convert::waitlist_entry(row),
    }))
}

/// POST /waitlist/{waitlist_id}/reject (admin). The `{notes}` body is optional.
pub async fn reject(
    State(state): State<AppState>,
    PathParam(waitlist_id): PathParam<i64>,
    body: Bytes,
) -> ApiResult<Json<MessageBody>> {
    let req: RejectRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RejectRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    db_call(&state, move |db| {
        Ok(db.reject_waitlist_entry(waitlist_id, req.notes.as_deref())?)
    })
    .await?;

    Ok(Json(MessageBody::new("User rejected")))
}

/// POST /waitlist/toggle (admin)
pub async fn toggle(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ToggleWaitlistRequest>,
) -> ApiResult<Json<ToggleWaitlistResponse>> {
    let enabled = req.enabled;
    db_call(&state, move |db| Ok(db.set_waitlist_enabled(enabled)?)).await?;

    info!("Waitlist {}", if enabled { "enabled" } else { "disabled" });
    Ok(Json(ToggleWaitlistResponse {
        message: "Waitlist setting updated".into(),
        enabled,
    }))
}

/// DELETE /waitlist/{waitlist_id} (admin)
pub async fn remove(
    State(state): State<AppState>,
    PathParam(waitlist_id): PathParam<i64>,
) -> ApiResult<Json<MessageBody>> {
    db_call(&state, move |db| Ok(db.delete_waitlist_entry(waitlist_id)?)).await?;
    Ok(Json(MessageBody::new("Entry deleted")))
}
