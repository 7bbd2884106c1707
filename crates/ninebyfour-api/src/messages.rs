use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use ninebyfour_db::models::DmCheck;
use ninebyfour_types::api::{
    CheckDmResponse, Claims, CreateConversationRequest, CreateConversationResponse, MessagesPage,
    SendMessageRequest, SuccessResponse, UnreadCountResponse,
};
use ninebyfour_types::models::ConversationSummary;

use crate::auth::AppState;
use crate::convert;
use crate::db_call;
use crate::error::{ApiError, ApiResult};
use crate::extract::{JsonBody, PathParam, QueryParams};

/// Raw `?before=&limit=`. Values that are empty or not integers are treated
/// as absent, so a bad cursor or page size falls back to the defaults.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub before: Option<String>,
    pub limit: Option<String>,
}

impl MessageQuery {
    /// The oldest `message_id` of the previous page. Only messages strictly
    /// older than it are returned.
    pub fn cursor(&self) -> Option<i64> {
        lenient_int(self.before.as_deref())
    }

    /// Requested page size; the data layer defaults it to 30 and caps it at 100.
    pub fn limit(&self) -> Option<i64> {
        lenient_int(self.limit.as_deref())
    }
}

fn lenient_int(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// GET /messages/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<UnreadCountResponse>> {
    let count = db_call(&state, move |db| Ok(db.unread_count(claims.id)?)).await?;
    Ok(Json(UnreadCountResponse { count }))
}

/// GET /messages/check-dm/{user_id}: can the caller message `user_id`?
pub async fn check_dm(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<CheckDmResponse>> {
    let check = db_call(&state, move |db| Ok(db.check_dm(claims.id, user_id)?)).await?;

    let response = match check {
        DmCheck::SelfTarget => CheckDmResponse {
            can_dm: false,
            reason: Some("Cannot message yourself".into()),
            conversation_id: None,
        },
        DmCheck::NotMutual => CheckDmResponse {
            can_dm: false,
            reason: Some("Mutual follow required".into()),
            conversation_id: None,
        },
        DmCheck::Allowed { conversation_id } => CheckDmResponse {
            can_dm: true,
            reason: None,
            conversation_id,
        },
    };
    Ok(Json(response))
}

/// GET /messages/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<ConversationSummary>>> {
    let rows = db_call(&state, move |db| Ok(db.list_conversations(claims.id)?)).await?;
    Ok(Json(rows.into_iter().map(convert::conversation_summary).collect()))
}

/// POST /messages/conversations: open (or reuse) the conversation with
/// `recipientId`. 201 when it was created, 200 when it already existed.
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<CreateConversationRequest>,
) -> ApiResult<impl IntoResponse> {
    let recipient_id = req
        .recipient_id
        .ok_or_else(|| ApiError::BadRequest("recipientId is required".into()))?;

    let (conversation_id, created) = db_call(&state, move |db| {
        Ok(db.find_or_create_conversation(claims.id, recipient_id)?)
    })
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(CreateConversationResponse {
            conversation_id,
            created,
        }),
    ))
}

/// GET /messages/conversations/{conversation_id}?before=&limit=
pub async fn get_messages(
    State(state): State<AppState>,
    PathParam(conversation_id): PathParam<i64>,
    QueryParams(query): QueryParams<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<MessagesPage>> {
    let (before, limit) = (query.cursor(), query.limit());
    let page = db_call(&state, move |db| {
        Ok(db.list_messages(conversation_id, claims.id, before, limit)?)
    })
    .await?;

    Ok(Json(MessagesPage {
        messages: page.messages.into_iter().map(convert::message).collect(),
        has_more: page.has_more,
    }))
}

/// POST /messages/conversations/{conversation_id}
pub async fn send_message(
    State(state): State<AppState>,
    PathParam(conversation_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let content = req.content.unwrap_or_default();

    let row = db_call(&state, move |db| {
        Ok(db.send_message(conversation_id, claims.id, &content)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

/// PATCH /messages/conversations/{conversation_id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    PathParam(conversation_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<SuccessResponse>> {
    db_call(&state, move |db| Ok(db.mark_read(conversation_id, claims.id)?)).await?;
    Ok(Json(SuccessResponse { success: true }))
}
