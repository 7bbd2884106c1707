use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::follows::are_mutual;
use crate::models::{ConversationRow, ConversationSummaryRow, DmCheck};
use crate::{Database, Error, Result};

/// Normalizes an unordered user pair to `(smaller, larger)`. Every
/// conversation lookup and insert goes through this, so the same pair can
/// never map to two rows.
pub fn canonical_pair(user_a: i64, user_b: i64) -> (i64, i64) {
    if user_a <= user_b {
        (user_a, user_b)
    } else {
        (user_b, user_a)
    }
}

impl Database {
    pub fn get_conversation(&self, conversation_id: i64) -> Result<Option<ConversationRow>> {
        self.with_conn(|conn| query_conversation(conn, conversation_id))
    }

    pub fn find_conversation(&self, user_a: i64, user_b: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| query_conversation_id(conn, user_a, user_b))
    }

    /// Returns the conversation for the pair, creating it when the two users
    /// follow each other. The flag is `true` when a row was inserted.
    pub fn find_or_create_conversation(&self, user_a: i64, user_b: i64) -> Result<(i64, bool)> {
        if user_a == user_b {
            return Err(Error::Validation("Cannot create conversation with yourself".into()));
        }

        let attempt = self.with_tx(|tx| {
            if !are_mutual(tx, user_a, user_b)? {
                return Err(Error::PermissionDenied(
                    "Mutual follow required to start a conversation".into(),
                ));
            }

            if let Some(id) = query_conversation_id(tx, user_a, user_b)? {
                return Ok((id, false));
            }

            let (one, two) = canonical_pair(user_a, user_b);
            tx.execute(
                "INSERT INTO conversations (user_one, user_two) VALUES (?1, ?2)",
                (one, two),
            )?;
            Ok((tx.last_insert_rowid(), true))
        });

        self.settle_creation(attempt, user_a, user_b)
    }

    fn settle_creation(
        &self,
        attempt: Result<(i64, bool)>,
        user_a: i64,
        user_b: i64,
    ) -> Result<(i64, bool)> {
        match attempt {
            // Another writer inserted the pair first; the unique key on
            // (user_one, user_two) rejected ours, so read theirs back.
            Err(e) if e.is_unique_violation() => {
                debug!("Conversation for users {} and {} already inserted", user_a, user_b);
                let id = self
                    .find_conversation(user_a, user_b)?
                    .ok_or_else(|| Error::NotFound("Conversation not found".into()))?;
                Ok((id, false))
            }
            Ok((id, true)) => {
                debug!("Created conversation {} for users {} and {}", id, user_a, user_b);
                Ok((id, true))
            }
            other => other,
        }
    }

    /// Inbox for `user_id`, most recently active conversation first.
    pub fn list_conversations(&self, user_id: i64) -> Result<Vec<ConversationSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.conversation_id, c.user_one, c.user_two, c.updated_at,
                        u.user_id, u.username, u.profile_image,
                        lm.content, lm.created_at, lm.sender_id,
                        (SELECT COUNT(*) FROM messages um
                          WHERE um.conversation_id = c.conversation_id
                            AND um.sender_id != ?1
                            AND um.is_read = 0) AS unread_count
                 FROM conversations c
                 JOIN users u
                   ON u.user_id = CASE WHEN c.user_one = ?1 THEN c.user_two ELSE c.user_one END
                 LEFT JOIN messages lm
                   ON lm.message_id = (SELECT MAX(m.message_id) FROM messages m
                                        WHERE m.conversation_id = c.conversation_id)
                 WHERE c.user_one = ?1 OR c.user_two = ?1
                 ORDER BY c.updated_at DESC, lm.message_id DESC, c.conversation_id DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationSummaryRow {
                        conversation_id: row.get(0)?,
                        user_one: row.get(1)?,
                        user_two: row.get(2)?,
                        updated_at: row.get(3)?,
                        other_user_id: row.get(4)?,
                        other_username: row.get(5)?,
                        other_profile_image: row.get(6)?,
                        last_message: row.get(7)?,
                        last_message_at: row.get(8)?,
                        last_sender_id: row.get(9)?,
                        unread_count: row.get(10)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Whether `current` may open a DM with `target` right now, plus the
    /// existing conversation if there is one.
    pub fn check_dm(&self, current: i64, target: i64) -> Result<DmCheck> {
        if current == target {
            return Ok(DmCheck::SelfTarget);
        }

        self.with_conn(|conn| {
            if !are_mutual(conn, current, target)? {
                return Ok(DmCheck::NotMutual);
            }
            let conversation_id = query_conversation_id(conn, current, target)?;
            Ok(DmCheck::Allowed { conversation_id })
        })
    }
}

fn query_conversation_id(conn: &Connection, user_a: i64, user_b: i64) -> Result<Option<i64>> {
    let (one, two) = canonical_pair(user_a, user_b);
    let id = conn
        .query_row(
            "SELECT conversation_id FROM conversations WHERE user_one = ?1 AND user_two = ?2",
            (one, two),
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn query_conversation(conn: &Connection, conversation_id: i64) -> Result<Option<ConversationRow>> {
    let row = conn
        .query_row(
            "SELECT conversation_id, user_one, user_two, created_at, updated_at
             FROM conversations WHERE conversation_id = ?1",
            [conversation_id],
            |row| {
                Ok(ConversationRow {
                    conversation_id: row.get(0)?,
                    user_one: row.get(1)?,
                    user_two: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Loads a conversation on behalf of `user_id`: `NotFound` when it does not
/// exist, `PermissionDenied` when the user is not one of its two members.
pub(crate) fn participant_conversation(
    conn: &Connection,
    conversation_id: i64,
    user_id: i64,
) -> Result<ConversationRow> {
    let conversation = query_conversation(conn, conversation_id)?
        .ok_or_else(|| Error::NotFound("Conversation not found".into()))?;
    if !conversation.has_participant(user_id) {
        return Err(Error::PermissionDenied(
            "You are not a participant in this conversation".into(),
        ));
    }
    Ok(conversation)
}
