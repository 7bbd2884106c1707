use rusqlite::Connection;

use crate::conversations::participant_conversation;
use crate::follows::are_mutual;
use crate::models::{MessagePage, MessageRow};
use crate::{Database, Error, NOW, Result};

pub const DEFAULT_PAGE_SIZE: i64 = 30;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page size actually used for a requested `limit`: absent or non-positive
/// values fall back to the default, large ones are capped.
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(n) if n > 0 => n.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

const MESSAGE_COLUMNS: &str = "m.message_id, m.conversation_id, m.sender_id, u.username,
                               m.content, m.is_read, m.created_at";

impl Database {
    /// Backward-cursor page of a conversation. Fetches the newest `limit`
    /// messages with `message_id < before` and returns them oldest first.
    /// `has_more` is set when the page came back full.
    pub fn list_messages(
        &self,
        conversation_id: i64,
        requester_id: i64,
        before: Option<i64>,
        limit: Option<i64>,
    ) -> Result<MessagePage> {
        let limit = clamp_limit(limit);

        self.with_conn(|conn| {
            participant_conversation(conn, conversation_id, requester_id)?;

            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS}
                 FROM messages m
                 JOIN users u ON u.user_id = m.sender_id
                 WHERE m.conversation_id = ?1
                   AND (?2 IS NULL OR m.message_id < ?2)
                 ORDER BY m.message_id DESC
                 LIMIT ?3"
            ))?;

            let mut messages = stmt
                .query_map((conversation_id, before, limit), map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            messages.reverse();

            let has_more = messages.len() as i64 == limit;
            Ok(MessagePage { messages, has_more })
        })
    }

    /// Appends a message. Membership and the mutual follow are both checked
    /// inside the same transaction as the insert, on every send.
    pub fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        content: &str,
    ) -> Result<MessageRow> {
        let content = content.trim();
        if content.is_empty() {
            return Err(Error::Validation("Message content is required".into()));
        }

        self.with_tx(|tx| {
            let conversation = participant_conversation(tx, conversation_id, sender_id)?;
            let recipient = conversation.other_participant(sender_id);
            if !are_mutual(tx, sender_id, recipient)? {
                return Err(Error::PermissionDenied(
                    "Mutual follow required to send messages".into(),
                ));
            }

            tx.execute(
                "INSERT INTO messages (conversation_id, sender_id, content) VALUES (?1, ?2, ?3)",
                (conversation_id, sender_id, content),
            )?;
            let message_id = tx.last_insert_rowid();

            tx.execute(
                &format!("UPDATE conversations SET updated_at = {NOW} WHERE conversation_id = ?1"),
                [conversation_id],
            )?;

            query_message(tx, message_id)
        })
    }

    /// Marks every unread message the other participant sent as read.
    /// Returns how many rows changed; zero on a repeat call.
    pub fn mark_read(&self, conversation_id: i64, requester_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            participant_conversation(conn, conversation_id, requester_id)?;
            let updated = conn.execute(
                "UPDATE messages SET is_read = 1
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND is_read = 0",
                (conversation_id, requester_id),
            )?;
            Ok(updated)
        })
    }

    /// Unread messages addressed to `user_id` across all their conversations.
    pub fn unread_count(&self, user_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 JOIN conversations c ON c.conversation_id = m.conversation_id
                 WHERE (c.user_one = ?1 OR c.user_two = ?1)
                   AND m.sender_id != ?1
                   AND m.is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }
}

fn query_message(conn: &Connection, message_id: i64) -> Result<MessageRow> {
    let row = conn.query_row(
        &format!(
            "SELECT {MESSAGE_COLUMNS}
             FROM messages m
             JOIN users u ON u.user_id = m.sender_id
             WHERE m.message_id = ?1"
        ),
        [message_id],
        map_message,
    )?;
    Ok(row)
}

fn map_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        message_id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        sender_username: row.get(3)?,
        content: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, clamp_limit};
    use crate::Error;
    use crate::test_support::{befriend, temp_db, user};

    #[test]
    fn limit_defaults_and_caps() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(-4)), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_limit(Some(10)), 10);
        assert_eq!(clamp_limit(Some(500)), MAX_PAGE_SIZE);
    }

    #[test]
    fn pages_backward_through_history() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        befriend(&db, a, b);
        let (conv, _) = db.find_or_create_conversation(a, b).unwrap();

        for i in 0..35 {
            let sender = if i % 2 == 0 { a } else { b };
            db.send_message(conv, sender, &format!("message {i}")).unwrap();
        }

        let first = db.list_messages(conv, a, None, Some(30)).unwrap();
        assert_eq!(first.messages.len(), 30);
        assert!(first.has_more);
        assert_eq!(first.messages[0].content, "message 5");
        assert_eq!(first.messages[29].content, "message 34");
        assert!(
            first
                .messages
                .windows(2)
                .all(|w| w[0].message_id < w[1].message_id)
        );

        let cursor = first.messages[0].message_id;
        let second = db.list_messages(conv, b, Some(cursor), Some(30)).unwrap();
        assert_eq!(second.messages.len(), 5);
        assert!(!second.has_more);
        assert_eq!(second.messages[0].content, "message 0");
        assert_eq!(second.messages[4].content, "message 4");
        assert_eq!(second.messages[0].sender_username, "alice");
    }

    #[test]
    fn send_trims_and_rejects_blank_content() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        befriend(&db, a, b);
        let (conv, _) = db.find_or_create_conversation(a, b).unwrap();

        assert!(matches!(
            db.send_message(conv, a, "   \n"),
            Err(Error::Validation(_))
        ));

        let msg = db.send_message(conv, a, "  hello  ").unwrap();
        assert_eq!(msg.content, "hello");
        assert_eq!(msg.sender_username, "alice");
        assert_eq!(msg.sender_id, a);
        assert!(!msg.is_read);
    }

    #[test]
    fn send_after_unfollow_is_denied_but_history_stays() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        befriend(&db, a, b);
        let (conv, _) = db.find_or_create_conversation(a, b).unwrap();
        db.send_message(conv, a, "before").unwrap();

        db.unfollow(b, a).unwrap();

        assert!(matches!(
            db.send_message(conv, a, "after"),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            db.send_message(conv, b, "after"),
            Err(Error::PermissionDenied(_))
        ));

        let page = db.list_messages(conv, b, None, None).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].content, "before");
    }

    #[test]
    fn outsiders_are_denied_and_missing_conversations_not_found() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        let eve = user(&db, "eve01");
        befriend(&db, a, b);
        let (conv, _) = db.find_or_create_conversation(a, b).unwrap();

        assert!(matches!(
            db.list_messages(conv, eve, None, None),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(
            db.send_message(conv, eve, "hi"),
            Err(Error::PermissionDenied(_))
        ));
        assert!(matches!(db.mark_read(conv, eve), Err(Error::PermissionDenied(_))));

        assert!(matches!(
            db.list_messages(conv + 100, a, None, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn mark_read_is_idempotent_and_updates_unread_count() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        let c = user(&db, "carol");
        befriend(&db, a, b);
        befriend(&db, a, c);
        let (with_b, _) = db.find_or_create_conversation(a, b).unwrap();
        let (with_c, _) = db.find_or_create_conversation(c, a).unwrap();

        db.send_message(with_b, b, "one").unwrap();
        db.send_message(with_b, b, "two").unwrap();
        db.send_message(with_b, a, "mine").unwrap();
        db.send_message(with_c, c, "three").unwrap();

        assert_eq!(db.unread_count(a).unwrap(), 3);
        assert_eq!(db.unread_count(b).unwrap(), 1);

        assert_eq!(db.mark_read(with_b, a).unwrap(), 2);
        assert_eq!(db.mark_read(with_b, a).unwrap(), 0);
        assert_eq!(db.unread_count(a).unwrap(), 1);
        // Alice's own message is still unread for Bob
        assert_eq!(db.unread_count(b).unwrap(), 1);
    }

    #[test]
    fn deleting_a_user_cascades_to_conversations() {
        let (_dir, db) = temp_db();
        let a = user(&db, "alice");
        let b = user(&db, "bobby");
        befriend(&db, a, b);
        let (conv, _) = db.find_or_create_conversation(a, b).unwrap();
        db.send_message(conv, b, "bye").unwrap();

        db.delete_user(b).unwrap();

        assert!(db.get_conversation(conv).unwrap().is_none());
        assert_eq!(db.unread_count(a).unwrap(), 0);
        assert!(db.list_followers(a).unwrap().is_empty());
    }
}
