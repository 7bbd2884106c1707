use serde::{Deserialize, Serialize};

use crate::models::{Message, Role};

// -- JWT Claims --

/// JWT claims shared by the token issuer (login) and the bearer-token
/// middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Accounts --

// Required fields are optional here so a missing one gets the
// field-specific 400 message. Anything else in the body (a `role`, say) is
// ignored: new accounts are always `user`.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    #[serde(default, alias = "invite_code", rename = "inviteCode")]
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: SessionUser,
}

/// Plain `{ "message": ... }` acknowledgement.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Direct messages --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDmResponse {
    #[serde(rename = "canDM")]
    pub can_dm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default, alias = "recipient_id", rename = "recipientId")]
    pub recipient_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationResponse {
    pub conversation_id: i64,
    pub created: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

// -- Waitlist --

#[derive(Debug, Deserialize)]
pub struct JoinWaitlistRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "full_name", rename = "fullName")]
    pub full_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinWaitlistResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyInviteRequest {
    #[serde(default, alias = "invite_code", rename = "inviteCode")]
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyInviteResponse {
    pub valid: bool,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveResponse {
    pub message: String,
    pub invite_code: String,
    pub entry: crate::models::WaitlistEntry,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleWaitlistRequest {
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ToggleWaitlistResponse {
    pub message: String,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub waitlist: i64,
}
