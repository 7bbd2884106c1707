use rusqlite::Connection;
use tracing::debug;

use crate::error::{Constraint, constraint_kind};
use crate::models::UserSummaryRow;
use crate::{Database, Error, Result};

impl Database {
    pub fn follow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        if follower_id == following_id {
            return Err(Error::Validation("You cannot follow yourself.".into()));
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, following_id) VALUES (?1, ?2)",
                (follower_id, following_id),
            )
            .map_err(|e| match constraint_kind(&e) {
                Some(Constraint::Unique) => {
                    Error::Conflict("You are already following this user.".into())
                }
                Some(Constraint::ForeignKey) => Error::NotFound("User not found".into()),
                _ => e.into(),
            })?;
            debug!("User {} followed {}", follower_id, following_id);
            Ok(())
        })
    }

    pub fn unfollow(&self, follower_id: i64, following_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
                (follower_id, following_id),
            )?;
            if removed == 0 {
                return Err(Error::Validation("You were not following this user.".into()));
            }
            debug!("User {} unfollowed {}", follower_id, following_id);
            Ok(())
        })
    }

    /// Users who follow `user_id`, oldest edge first.
    pub fn list_followers(&self, user_id: i64) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT u.user_id, u.username, u.email
                 FROM follows f
                 JOIN users u ON u.user_id = f.follower_id
                 WHERE f.following_id = ?1
                 ORDER BY f.rowid",
                user_id,
            )
        })
    }

    /// Users that `user_id` follows, oldest edge first.
    pub fn list_following(&self, user_id: i64) -> Result<Vec<UserSummaryRow>> {
        self.with_conn(|conn| {
            query_summaries(
                conn,
                "SELECT u.user_id, u.username, u.email
                 FROM follows f
                 JOIN users u ON u.user_id = f.following_id
                 WHERE f.follower_id = ?1
                 ORDER BY f.rowid",
                user_id,
            )
        })
    }

    pub fn are_mutual(&self, user_a: i64, user_b: i64) -> Result<bool> {
        self.with_conn(|conn| are_mutual(conn, user_a, user_b))
    }
}

/// True iff both directed edges between the two users exist. This is the
/// only permission check for direct messaging and is never cached.
pub(crate) fn are_mutual(conn: &Connection, user_a: i64, user_b: i64) -> Result<bool> {
    if user_a == user_b {
        return Ok(false);
    }
    let edges: i64 = conn.query_row(
        "SELECT COUNT(*) FROM follows
         WHERE (follower_id = ?1 AND following_id = ?2)
            OR (follower_id = ?2 AND following_id = ?1)",
        (user_a, user_b),
        |row| row.get(0),
    )?;
    Ok(edges == 2)
}

fn query_summaries(conn: &Connection, sql: &str, user_id: i64) -> Result<Vec<UserSummaryRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([user_id], |row| {
            Ok(UserSummaryRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
