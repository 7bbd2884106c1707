use ninebyfour_types::models::Role;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::{Constraint, constraint_kind};
use crate::models::UserRow;
use crate::{Database, Error, Result};

/// A validated registration, password already hashed.
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub email: &'a str,
}

impl Database {
    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        email: &str,
        role: Role,
    ) -> Result<i64> {
        self.with_conn(|conn| insert_user(conn, username, password_hash, email, role))
    }

    /// Creates a `user` account. With `invite_code` set, the code must belong
    /// to an approved waitlist entry for the same email; the entry moves to
    /// `registered` and its code is cleared in the same transaction as the
    /// user insert.
    pub fn register_user(&self, new_user: &NewUser<'_>, invite_code: Option<&str>) -> Result<i64> {
        self.with_tx(|tx| {
            if let Some(code) = invite_code {
                let approved: Option<i64> = tx
                    .query_row(
                        "SELECT waitlist_id FROM waitlist
                         WHERE email = ?1 AND invite_code = ?2 AND status = 'approved'",
                        (new_user.email, code),
                        |row| row.get(0),
                    )
                    .optional()?;
                if approved.is_none() {
                    return Err(Error::PermissionDenied(
                        "Invalid or unapproved invite code for this email.".into(),
                    ));
                }
            }

            let user_id = insert_user(
                tx,
                new_user.username,
                new_user.password_hash,
                new_user.email,
                Role::User,
            )?;

            if invite_code.is_some() {
                tx.execute(
                    "UPDATE waitlist SET status = 'registered', invite_code = NULL WHERE email = ?1",
                    [new_user.email],
                )?;
            }

            Ok(user_id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "user_id = ?1", id))
    }

    /// Removes the account; follows, conversations and messages go with it.
    pub fn delete_user(&self, id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM users WHERE user_id = ?1", [id])?;
            if removed == 0 {
                return Err(Error::NotFound("User not found".into()));
            }
            info!("Deleted user {}", id);
            Ok(())
        })
    }

    /// Returns false when no such user exists.
    pub fn set_role(&self, username: &str, role: Role) -> Result<bool> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE users SET role = ?1 WHERE username = ?2",
                (role.as_str(), username),
            )?;
            Ok(updated > 0)
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
        })
    }
}

fn insert_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    email: &str,
    role: Role,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, password, email, role) VALUES (?1, ?2, ?3, ?4)",
        (username, password_hash, email, role.as_str()),
    )
    .map_err(|e| match constraint_kind(&e) {
        Some(Constraint::Unique) => Error::Conflict("Username or email already exists.".into()),
        _ => e.into(),
    })?;
    Ok(conn.last_insert_rowid())
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    predicate: &str,
    value: P,
) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT user_id, username, password, email, role, profile_image, created_at
         FROM users WHERE {predicate}"
    ))?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                email: row.get(3)?,
                role: row.get(4)?,
                profile_image: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use ninebyfour_types::models::Role;

    use super::NewUser;
    use crate::Error;
    use crate::test_support::{temp_db, user};

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let (_dir, db) = temp_db();
        user(&db, "alice");

        let same_name = db.create_user("alice", "h", "other@example.com", Role::User);
        assert!(matches!(same_name, Err(Error::Conflict(_))));

        let same_email = db.create_user("alice2", "h", "alice@example.com", Role::User);
        assert!(matches!(same_email, Err(Error::Conflict(_))));
    }

    #[test]
    fn lookup_and_role_change() {
        let (_dir, db) = temp_db();
        let id = user(&db, "alice");

        let row = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(row.id, id);
        assert_eq!(row.role, "user");
        assert!(db.get_user_by_id(id + 1).unwrap().is_none());

        assert!(db.set_role("alice", Role::Admin).unwrap());
        assert!(!db.set_role("nobody", Role::Admin).unwrap());
        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().role, "admin");
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn register_with_invite_consumes_the_code() {
        let (_dir, db) = temp_db();
        let admin = user(&db, "admin");
        let entry = db.join_waitlist("new@example.com", None).unwrap();
        let waitlist_id = match entry {
            crate::models::JoinOutcome::Added { waitlist_id } => waitlist_id,
            other => panic!("unexpected {other:?}"),
        };
        db.approve_waitlist_entry(waitlist_id, admin, "code-123").unwrap();

        let wrong_email = NewUser {
            username: "someone",
            password_hash: "h",
            email: "other@example.com",
        };
        assert!(matches!(
            db.register_user(&wrong_email, Some("code-123")),
            Err(Error::PermissionDenied(_))
        ));

        let new_user = NewUser {
            username: "newbie",
            password_hash: "h",
            email: "new@example.com",
        };
        db.register_user(&new_user, Some("code-123")).unwrap();

        let entries = db.list_waitlist(None).unwrap();
        assert_eq!(entries[0].status, "registered");
        assert!(entries[0].invite_code.is_none());
        assert!(db.verify_invite("code-123").unwrap().is_none());
    }

    #[test]
    fn failed_registration_leaves_waitlist_untouched() {
        let (_dir, db) = temp_db();
        let admin = user(&db, "admin");
        db.join_waitlist("admin@example.com", None).unwrap();
        let id = db.list_waitlist(None).unwrap()[0].waitlist_id;
        db.approve_waitlist_entry(id, admin, "code-xyz").unwrap();

        // Email already belongs to a user, so the insert fails and rolls back
        let clash = NewUser {
            username: "fresh",
            password_hash: "h",
            email: "admin@example.com",
        };
        assert!(matches!(
            db.register_user(&clash, Some("code-xyz")),
            Err(Error::Conflict(_))
        ));

        let entry = &db.list_waitlist(None).unwrap()[0];
        assert_eq!(entry.status, "approved");
        assert_eq!(entry.invite_code.as_deref(), Some("code-xyz"));
    }
}
