pub mod admin;
pub mod auth;
pub mod convert;
pub mod error;
pub mod extract;
pub mod follows;
pub mod messages;
pub mod middleware;
pub mod waitlist;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use tracing::error;

use ninebyfour_db::Database;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::{require_admin, require_auth};

/// Builds every route with its auth layers. Cross-cutting layers (tracing,
/// CORS) are added by the server binary.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/follow-graph/{user_id}/followers", get(follows::list_followers))
        .route("/follow-graph/{user_id}/following", get(follows::list_following))
        .route("/waitlist/join", post(waitlist::join))
        .route("/waitlist/verify", post(waitlist::verify));

    let protected_routes = Router::new()
        .route("/users/{user_id}", delete(auth::delete_user))
        .route("/follow-graph/{user_id}/follow", post(follows::follow))
        .route("/follow-graph/{user_id}/unfollow", delete(follows::unfollow))
        .route("/messages/unread-count", get(messages::unread_count))
        .route("/messages/check-dm/{user_id}", get(messages::check_dm))
        .route(
            "/messages/conversations",
            get(messages::list_conversations).post(messages::create_conversation),
        )
        .route(
            "/messages/conversations/{conversation_id}",
            get(messages::get_messages).post(messages::send_message),
        )
        .route(
            "/messages/conversations/{conversation_id}/read",
            patch(messages::mark_read),
        )
        .layer(from_fn_with_state(state.clone(), require_auth));

    // Layers run bottom-up: authenticate first, then check the role
    let admin_routes = Router::new()
        .route("/waitlist", get(waitlist::list))
        .route("/waitlist/toggle", post(waitlist::toggle))
        .route("/waitlist/{waitlist_id}", delete(waitlist::remove))
        .route("/waitlist/{waitlist_id}/approve", post(waitlist::approve))
        .route("/waitlist/{waitlist_id}/reject", post(waitlist::reject))
        .route("/admin/stats", get(admin::stats))
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Runs blocking database work off the async runtime. The pooled connection
/// is checked out and returned inside the closure.
pub(crate) async fn db_call<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
}
