//! Row -> API model conversions.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use ninebyfour_db::models::{ConversationSummaryRow, MessageRow, UserSummaryRow, WaitlistRow};
use ninebyfour_types::models::{
    ConversationSummary, Message, UserSummary, WaitlistEntry, WaitlistStatus,
};

/// Parses a stored timestamp. Rows written by this service are RFC 3339;
/// plain `YYYY-MM-DD HH:MM:SS` (SQLite `datetime()`) is accepted as UTC.
pub fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn user_summary(row: UserSummaryRow) -> UserSummary {
    UserSummary {
        id: row.id,
        username: row.username,
        email: row.email,
    }
}

pub fn message(row: MessageRow) -> Message {
    let created_at = parse_timestamp(&row.created_at, &format!("message {}", row.message_id));
    Message {
        message_id: row.message_id,
        conversation_id: row.conversation_id,
        sender_id: row.sender_id,
        sender_username: row.sender_username,
        content: row.content,
        is_read: row.is_read,
        created_at,
    }
}

pub fn conversation_summary(row: ConversationSummaryRow) -> ConversationSummary {
    let context = format!("conversation {}", row.conversation_id);
    ConversationSummary {
        conversation_id: row.conversation_id,
        user_one: row.user_one,
        user_two: row.user_two,
        updated_at: parse_timestamp(&row.updated_at, &context),
        other_user_id: row.other_user_id,
        other_username: row.other_username,
        other_profile_image: row.other_profile_image,
        last_message: row.last_message,
        last_message_at: row.last_message_at.map(|raw| parse_timestamp(&raw, &context)),
        last_sender_id: row.last_sender_id,
        unread_count: row.unread_count,
    }
}

pub fn waitlist_entry(row: WaitlistRow) -> WaitlistEntry {
    let context = format!("waitlist entry {}", row.waitlist_id);
    let status = row.status.parse().unwrap_or_else(|e| {
        warn!("{} on {}", e, context);
        WaitlistStatus::Pending
    });
    WaitlistEntry {
        waitlist_id: row.waitlist_id,
        email: row.email,
        full_name: row.full_name,
        status,
        invite_code: row.invite_code,
        requested_at: parse_timestamp(&row.requested_at, &context),
        approved_at: row.approved_at.map(|raw| parse_timestamp(&raw, &context)),
        approved_by: row.approved_by,
        notes: row.notes,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::parse_timestamp;

    #[test]
    fn parses_stored_and_legacy_formats() {
        let stored = parse_timestamp("2026-03-04T05:06:07.089Z", "test");
        assert_eq!((stored.year(), stored.month(), stored.day()), (2026, 3, 4));
        assert_eq!(stored.timestamp_subsec_millis(), 89);

        let legacy = parse_timestamp("2026-03-04 05:06:07", "test");
        assert_eq!((legacy.hour(), legacy.minute(), legacy.second()), (5, 6, 7));
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday", "test").timestamp(), 0);
    }
}
