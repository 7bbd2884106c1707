use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};

use ninebyfour_types::api::{Claims, MessageBody};
use ninebyfour_types::models::UserSummary;

use crate::auth::AppState;
use crate::convert;
use crate::db_call;
use crate::error::ApiResult;
use crate::extract::PathParam;

/// POST /follow-graph/{user_id}/follow: the caller follows `user_id`.
pub async fn follow(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    db_call(&state, move |db| Ok(db.follow(claims.id, user_id)?)).await?;
    Ok(Json(MessageBody::new("Followed successfully.")))
}

/// DELETE /follow-graph/{user_id}/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    db_call(&state, move |db| Ok(db.unfollow(claims.id, user_id)?)).await?;
    Ok(Json(MessageBody::new("Unfollowed successfully.")))
}

pub async fn list_followers(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let rows = db_call(&state, move |db| Ok(db.list_followers(user_id)?)).await?;
    Ok(Json(rows.into_iter().map(convert::user_summary).collect()))
}

pub async fn list_following(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let rows = db_call(&state, move |db| Ok(db.list_following(user_id)?)).await?;
    Ok(Json(rows.into_iter().map(convert::user_summary).collect()))
}
