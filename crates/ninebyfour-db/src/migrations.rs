use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            user_id         INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            email           TEXT NOT NULL UNIQUE,
            role            TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
            profile_image   TEXT,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS follows (
            follower_id     INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            following_id    INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            PRIMARY KEY (follower_id, following_id),
            CHECK (follower_id <> following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_follower ON follows(follower_id);
        CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id);

        -- One row per unordered pair: ids are stored smallest first
        CREATE TABLE IF NOT EXISTS conversations (
            conversation_id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_one        INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            user_two        INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE (user_one, user_two),
            CHECK (user_one < user_two)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user_one ON conversations(user_one);
        CREATE INDEX IF NOT EXISTS idx_conversations_user_two ON conversations(user_two);

        CREATE TABLE IF NOT EXISTS messages (
            message_id      INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id INTEGER NOT NULL REFERENCES conversations(conversation_id) ON DELETE CASCADE,
            sender_id       INTEGER NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
            content         TEXT NOT NULL,
            is_read         INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, message_id);
        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(conversation_id, is_read) WHERE is_read = 0;

        CREATE TABLE IF NOT EXISTS waitlist (
            waitlist_id     INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT NOT NULL UNIQUE,
            full_name       TEXT,
            status          TEXT NOT NULL DEFAULT 'pending'
                            CHECK (status IN ('pending', 'approved', 'rejected', 'registered')),
            invite_code     TEXT UNIQUE,
            requested_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            approved_at     TEXT,
            approved_by     INTEGER REFERENCES users(user_id) ON DELETE SET NULL,
            notes           TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_waitlist_status ON waitlist(status);

        CREATE TABLE IF NOT EXISTS app_settings (
            setting_key     TEXT PRIMARY KEY,
            setting_value   TEXT NOT NULL,
            updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- Registration starts invite-only
        INSERT OR IGNORE INTO app_settings (setting_key, setting_value)
            VALUES ('waitlist_enabled', 'true');
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
