use axum::{Json, extract::State};

use ninebyfour_types::api::StatsResponse;

use crate::auth::AppState;
use crate::db_call;
use crate::error::ApiResult;

/// GET /admin/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let (users, waitlist) =
        db_call(&state, |db| Ok((db.count_users()?, db.count_waitlist()?))).await?;
    Ok(Json(StatsResponse { users, waitlist }))
}
