use ninebyfour_types::models::WaitlistStatus;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::models::{JoinOutcome, WaitlistRow};
use crate::{Database, Error, NOW, Result};

const WAITLIST_ENABLED: &str = "waitlist_enabled";

const WAITLIST_COLUMNS: &str = "waitlist_id, email, full_name, status, invite_code,
                                requested_at, approved_at, approved_by, notes";

impl Database {
    pub fn join_waitlist(&self, email: &str, full_name: Option<&str>) -> Result<JoinOutcome> {
        self.with_tx(|tx| {
            if let Some(status) = query_status_by_email(tx, email)? {
                return Ok(JoinOutcome::AlreadyListed { status });
            }
            tx.execute(
                "INSERT INTO waitlist (email, full_name, status) VALUES (?1, ?2, 'pending')",
                (email, full_name),
            )?;
            Ok(JoinOutcome::Added {
                waitlist_id: tx.last_insert_rowid(),
            })
        })
    }

    /// Email of the approved entry holding `invite_code`, if any.
    pub fn verify_invite(&self, invite_code: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let email = conn
                .query_row(
                    "SELECT email FROM waitlist WHERE invite_code = ?1 AND status = 'approved'",
                    [invite_code],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(email)
        })
    }

    /// Entries newest first, optionally restricted to one status.
    pub fn list_waitlist(&self, status: Option<WaitlistStatus>) -> Result<Vec<WaitlistRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WAITLIST_COLUMNS} FROM waitlist
                 WHERE ?1 IS NULL OR status = ?1
                 ORDER BY requested_at DESC, waitlist_id DESC"
            ))?;
            let rows = stmt
                .query_map([status.map(|s| s.as_str())], map_waitlist)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn approve_waitlist_entry(
        &self,
        waitlist_id: i64,
        approved_by: i64,
        invite_code: &str,
    ) -> Result<WaitlistRow> {
        self.with_tx(|tx| {
            let updated = tx.execute(
                &format!(
                    "UPDATE waitlist
                     SET status = 'approved', invite_code = ?1, approved_at = {NOW}, approved_by = ?2
                     WHERE waitlist_id = ?3"
                ),
                (invite_code, approved_by, waitlist_id),
            )?;
            if updated == 0 {
                return Err(not_found());
            }
            debug!("Approved waitlist entry {}", waitlist_id);
            query_entry(tx, waitlist_id)
        })
    }

    pub fn reject_waitlist_entry(&self, waitlist_id: i64, notes: Option<&str>) -> Result<()> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE waitlist SET status = 'rejected', notes = ?1 WHERE waitlist_id = ?2",
                (notes, waitlist_id),
            )?;
            if updated == 0 {
                return Err(not_found());
            }
            Ok(())
        })
    }

    pub fn delete_waitlist_entry(&self, waitlist_id: i64) -> Result<()> {
        self.with_conn(|conn| {
            let removed =
                conn.execute("DELETE FROM waitlist WHERE waitlist_id = ?1", [waitlist_id])?;
            if removed == 0 {
                return Err(not_found());
            }
            Ok(())
        })
    }

    pub fn count_waitlist(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM waitlist", [], |row| row.get(0))?)
        })
    }

    /// Whether registration currently needs an invite code. A missing
    /// setting means the gate is off.
    pub fn is_waitlist_enabled(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT setting_value FROM app_settings WHERE setting_key = ?1",
                    [WAITLIST_ENABLED],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.as_deref() == Some("true"))
        })
    }

    pub fn set_waitlist_enabled(&self, enabled: bool) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO app_settings (setting_key, setting_value) VALUES (?1, ?2)
                     ON CONFLICT (setting_key)
                     DO UPDATE SET setting_value = excluded.setting_value, updated_at = {NOW}"
                ),
                (WAITLIST_ENABLED, if enabled { "true" } else { "false" }),
            )?;
            Ok(())
        })
    }
}

fn not_found() -> Error {
    Error::NotFound("Waitlist entry not found".into())
}

fn query_status_by_email(conn: &Connection, email: &str) -> Result<Option<String>> {
    let status = conn
        .query_row("SELECT status FROM waitlist WHERE email = ?1", [email], |row| row.get(0))
        .optional()?;
    Ok(status)
}

fn query_entry(conn: &Connection, waitlist_id: i64) -> Result<WaitlistRow> {
    let row = conn.query_row(
        &format!("SELECT {WAITLIST_COLUMNS} FROM waitlist WHERE waitlist_id = ?1"),
        [waitlist_id],
        map_waitlist,
    )?;
    Ok(row)
}

fn map_waitlist(row: &rusqlite::Row<'_>) -> rusqlite::Result<WaitlistRow> {
    Ok(WaitlistRow {
        waitlist_id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        status: row.get(3)?,
        invite_code: row.get(4)?,
        requested_at: row.get(5)?,
        approved_at: row.get(6)?,
        approved_by: row.get(7)?,
        notes: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use ninebyfour_types::models::WaitlistStatus;

    use crate::Error;
    use crate::models::JoinOutcome;
    use crate::test_support::{temp_db, user};

    #[test]
    fn joining_twice_reports_existing_status() {
        let (_dir, db) = temp_db();
        assert!(matches!(
            db.join_waitlist("fan@example.com", Some("A Fan")).unwrap(),
            JoinOutcome::Added { .. }
        ));
        assert_eq!(
            db.join_waitlist("fan@example.com", None).unwrap(),
            JoinOutcome::AlreadyListed {
                status: "pending".into()
            }
        );
        assert_eq!(db.count_waitlist().unwrap(), 1);
    }

    #[test]
    fn approve_issues_code_and_verify_finds_it() {
        let (_dir, db) = temp_db();
        let admin = user(&db, "admin");
        db.join_waitlist("fan@example.com", None).unwrap();
        let id = db.list_waitlist(None).unwrap()[0].waitlist_id;

        assert!(db.verify_invite("abc").unwrap().is_none());

        let entry = db.approve_waitlist_entry(id, admin, "abc").unwrap();
        assert_eq!(entry.status, "approved");
        assert_eq!(entry.approved_by, Some(admin));
        assert!(entry.approved_at.is_some());

        assert_eq!(db.verify_invite("abc").unwrap().as_deref(), Some("fan@example.com"));
        assert!(matches!(
            db.approve_waitlist_entry(id + 10, admin, "zzz"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn filters_by_status_and_deletes() {
        let (_dir, db) = temp_db();
        db.join_waitlist("one@example.com", None).unwrap();
        db.join_waitlist("two@example.com", None).unwrap();
        let all = db.list_waitlist(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].email, "two@example.com");

        let rejected_id = all[1].waitlist_id;
        db.reject_waitlist_entry(rejected_id, Some("spam")).unwrap();

        let rejected = db.list_waitlist(Some(WaitlistStatus::Rejected)).unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].notes.as_deref(), Some("spam"));
        assert_eq!(db.list_waitlist(Some(WaitlistStatus::Pending)).unwrap().len(), 1);

        db.delete_waitlist_entry(rejected_id).unwrap();
        assert!(matches!(
            db.delete_waitlist_entry(rejected_id),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            db.reject_waitlist_entry(rejected_id, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn waitlist_setting_toggles() {
        let (_dir, db) = temp_db();
        assert!(db.is_waitlist_enabled().unwrap());
        db.set_waitlist_enabled(false).unwrap();
        assert!(!db.is_waitlist_enabled().unwrap());
        db.set_waitlist_enabled(true).unwrap();
        assert!(db.is_waitlist_enabled().unwrap());
    }
}
