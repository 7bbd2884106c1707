//! Database row types: these map directly to SQLite rows.
//! Distinct from ninebyfour-types API models to keep the DB layer independent.
//! Timestamps stay as the stored RFC 3339 text.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: String,
    pub profile_image: Option<String>,
    pub created_at: String,
}

pub struct UserSummaryRow {
    pub id: i64,
    pub username: String,
    pub email: String,
}

pub struct ConversationRow {
    pub conversation_id: i64,
    pub user_one: i64,
    pub user_two: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationRow {
    pub fn has_participant(&self, user_id: i64) -> bool {
        self.user_one == user_id || self.user_two == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: i64) -> i64 {
        if self.user_one == user_id {
            self.user_two
        } else {
            self.user_one
        }
    }
}

pub struct ConversationSummaryRow {
    pub conversation_id: i64,
    pub user_one: i64,
    pub user_two: i64,
    pub updated_at: String,
    pub other_user_id: i64,
    pub other_username: String,
    pub other_profile_image: Option<String>,
    pub last_message: Option<String>,
    pub last_message_at: Option<String>,
    pub last_sender_id: Option<i64>,
    pub unread_count: i64,
}

pub struct MessageRow {
    pub message_id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
}

/// One page of a conversation, oldest message first.
pub struct MessagePage {
    pub messages: Vec<MessageRow>,
    pub has_more: bool,
}

/// Outcome of a DM-eligibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DmCheck {
    SelfTarget,
    NotMutual,
    Allowed { conversation_id: Option<i64> },
}

pub struct WaitlistRow {
    pub waitlist_id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub status: String,
    pub invite_code: Option<String>,
    pub requested_at: String,
    pub approved_at: Option<String>,
    pub approved_by: Option<i64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Added { waitlist_id: i64 },
    /// The email is already listed; carries the entry's current status.
    AlreadyListed { status: String },
}
