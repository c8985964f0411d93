use anyhow::Result;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::Database;
use crate::models::{ApprovalRow, MessageRow, RuleRow, UserRow};

/// Result of a login-time user lookup. Existence check, population count
/// and insert run inside one transaction so two racing first logins
/// cannot blow past the cap.
pub enum LoginOutcome {
    Existing(UserRow),
    Created(UserRow),
    CapacityReached,
}

impl Database {
    // -- Users --

    pub fn get_user(&self, name: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, name))
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }

    /// Returns the existing record unchanged, or creates a new one if the
    /// population is still under `max_users`. A returning user is never
    /// promoted: `admin_if_new` only applies to the freshly created row.
    pub fn get_or_create_user(
        &self,
        name: &str,
        admin_if_new: bool,
        max_users: usize,
    ) -> Result<LoginOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if let Some(row) = query_user(&tx, name)? {
                return Ok(LoginOutcome::Existing(row));
            }

            let count: i64 = tx.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
            if count >= max_users as i64 {
                return Ok(LoginOutcome::CapacityReached);
            }

            let created_at = Utc::now().to_rfc3339();
            tx.execute(
                "INSERT INTO users (name, is_admin, has_approved_rules, created_at)
                 VALUES (?1, ?2, 0, ?3)",
                params![name, admin_if_new, created_at],
            )?;
            tx.commit()?;

            Ok(LoginOutcome::Created(UserRow {
                name: name.to_string(),
                is_admin: admin_if_new,
                has_approved_rules: false,
                created_at,
            }))
        })
    }

    // -- Rules --

    /// All rules ascending by display order; equal orders keep insertion
    /// order (rowid tiebreak).
    pub fn list_rules(&self) -> Result<Vec<RuleRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, content, display_order, created_at, updated_at
                 FROM rules
                 ORDER BY display_order ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(RuleRow {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        content: row.get(2)?,
                        display_order: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn get_rule(&self, id: &str) -> Result<Option<RuleRow>> {
        self.with_conn(|conn| query_rule(conn, id))
    }

    pub fn insert_rule(
        &self,
        id: &str,
        title: &str,
        content: &str,
        display_order: i64,
    ) -> Result<RuleRow> {
        self.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO rules (id, title, content, display_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![id, title, content, display_order, now],
            )?;
            Ok(RuleRow {
                id: id.to_string(),
                title: title.to_string(),
                content: content.to_string(),
                display_order,
                created_at: now.clone(),
                updated_at: now,
            })
        })
    }

    /// Merge the supplied fields into an existing rule and refresh
    /// `updated_at`. Returns `None` (collection untouched) when the id is
    /// unknown.
    pub fn update_rule(
        &self,
        id: &str,
        title: Option<&str>,
        content: Option<&str>,
        display_order: Option<i64>,
    ) -> Result<Option<RuleRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(existing) = query_rule(&tx, id)? else {
                return Ok(None);
            };

            let updated = RuleRow {
                id: existing.id,
                title: title.map(str::to_string).unwrap_or(existing.title),
                content: content.map(str::to_string).unwrap_or(existing.content),
                display_order: display_order.unwrap_or(existing.display_order),
                created_at: existing.created_at,
                updated_at: Utc::now().to_rfc3339(),
            };

            tx.execute(
                "UPDATE rules SET title = ?2, content = ?3, display_order = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![
                    updated.id,
                    updated.title,
                    updated.content,
                    updated.display_order,
                    updated.updated_at
                ],
            )?;
            tx.commit()?;

            Ok(Some(updated))
        })
    }

    /// Idempotent: deleting an absent id is a success no-op.
    pub fn delete_rule(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM rules WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    pub fn count_rules(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM rules", [], |r| r.get(0))?))
    }

    // -- Messages --

    pub fn insert_message(&self, id: &str, sender_name: &str, content: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let now = Utc::now();
            let created_at = now.to_rfc3339();
            let timestamp = now.timestamp_millis();
            conn.execute(
                "INSERT INTO messages (id, sender_name, content, is_read, created_at, timestamp)
                 VALUES (?1, ?2, ?3, 0, ?4, ?5)",
                params![id, sender_name, content, created_at, timestamp],
            )?;
            Ok(MessageRow {
                id: id.to_string(),
                sender_name: sender_name.to_string(),
                content: content.to_string(),
                is_read: false,
                created_at,
                timestamp,
            })
        })
    }

    /// Newest first.
    pub fn list_messages(&self) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_name, content, is_read, created_at, timestamp
                 FROM messages
                 ORDER BY timestamp DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender_name: row.get(1)?,
                        content: row.get(2)?,
                        is_read: row.get(3)?,
                        created_at: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Idempotent: already-read and absent ids are both no-ops.
    pub fn mark_message_read(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("UPDATE messages SET is_read = 1 WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Flip every unread message in one statement. SQLite makes the whole
    /// update atomic, so partial success cannot be reported as success.
    /// Returns how many messages were flipped.
    pub fn mark_all_messages_read(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute("UPDATE messages SET is_read = 1 WHERE is_read = 0", [])?;
            Ok(changed)
        })
    }

    pub fn count_unread(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM messages WHERE is_read = 0", [], |r| {
                r.get(0)
            })?)
        })
    }

    // -- Approvals --

    /// Upsert the ledger row and set the user's approval flag as one
    /// transaction, so the two sources of truth cannot diverge under
    /// partial failure.
    pub fn record_approval(&self, user_name: &str) -> Result<ApprovalRow> {
        self.with_conn_mut(|conn| {
            let now = Utc::now();
            let approved_at = now.to_rfc3339();
            let timestamp = now.timestamp_millis();

            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO approvals (user_name, approved_at, timestamp)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_name) DO UPDATE SET
                    approved_at = excluded.approved_at,
                    timestamp = excluded.timestamp",
                params![user_name, approved_at, timestamp],
            )?;
            tx.execute(
                "UPDATE users SET has_approved_rules = 1 WHERE name = ?1",
                [user_name],
            )?;
            tx.commit()?;

            Ok(ApprovalRow {
                user_name: user_name.to_string(),
                approved_at,
                timestamp,
            })
        })
    }

    /// A ledger row OR the user flag counts as approval. The ledger is
    /// authoritative; the flag covers rows imported from stores where the
    /// two writes were not atomic.
    pub fn has_approved(&self, user_name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM approvals WHERE user_name = ?1)
                     OR EXISTS(SELECT 1 FROM users WHERE name = ?1 AND has_approved_rules = 1)",
                [user_name],
                |r| r.get(0),
            )?)
        })
    }

    /// First approver first.
    pub fn list_approvals(&self) -> Result<Vec<ApprovalRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_name, approved_at, timestamp
                 FROM approvals
                 ORDER BY timestamp ASC, rowid ASC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ApprovalRow {
                        user_name: row.get(0)?,
                        approved_at: row.get(1)?,
                        timestamp: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    // -- Global reset --

    pub fn reset_generation(&self) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT value FROM meta WHERE key = 'reset_generation'",
                [],
                |r| r.get(0),
            )?)
        })
    }

    /// Delete everything except the reserved admin user record, as one
    /// transaction, and bump the reset generation. Returns the new
    /// generation; any failure rolls the whole thing back.
    pub fn reset_all(&self, admin_name: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM users WHERE name != ?1", [admin_name])?;
            tx.execute("DELETE FROM approvals", [])?;
            tx.execute("DELETE FROM messages", [])?;
            tx.execute(
                "UPDATE meta SET value = value + 1 WHERE key = 'reset_generation'",
                [],
            )?;
            let generation: i64 = tx.query_row(
                "SELECT value FROM meta WHERE key = 'reset_generation'",
                [],
                |r| r.get(0),
            )?;
            tx.commit()?;
            Ok(generation)
        })
    }
}

fn query_user(conn: &Connection, name: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT name, is_admin, has_approved_rules, created_at FROM users WHERE name = ?1",
    )?;

    let row = stmt
        .query_row([name], |row| {
            Ok(UserRow {
                name: row.get(0)?,
                is_admin: row.get(1)?,
                has_approved_rules: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_rule(conn: &Connection, id: &str) -> Result<Option<RuleRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, display_order, created_at, updated_at
         FROM rules WHERE id = ?1",
    )?;

    let row = stmt
        .query_row([id], |row| {
            Ok(RuleRow {
                id: row.get(0)?,
                title: row.get(1)?,
                content: row.get(2)?,
                display_order: row.get(3)?,
                created_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_rule(db: &Database, id: &str, order: i64) {
        db.insert_rule(id, &format!("rule {id}"), "content", order)
            .unwrap();
    }

    #[test]
    fn add_then_list_contains_the_new_rule() {
        let db = test_db();
        db.insert_rule("r1", "Quiet hours", "Silence after ten.", 3)
            .unwrap();

        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, "r1");
        assert_eq!(rules[0].title, "Quiet hours");
        assert_eq!(rules[0].content, "Silence after ten.");
        assert_eq!(rules[0].display_order, 3);
    }

    #[test]
    fn list_sorts_by_order_regardless_of_insertion_sequence() {
        let db = test_db();
        add_rule(&db, "c", 3);
        add_rule(&db, "a", 1);
        add_rule(&db, "b", 2);

        let ids: Vec<String> = db.list_rules().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn equal_orders_keep_insertion_order() {
        let db = test_db();
        add_rule(&db, "first", 1);
        add_rule(&db, "second", 1);
        add_rule(&db, "third", 1);

        let ids: Vec<String> = db.list_rules().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, ["first", "second", "third"]);
    }

    #[test]
    fn update_unknown_id_fails_and_changes_nothing() {
        let db = test_db();
        add_rule(&db, "r1", 1);

        let outcome = db.update_rule("missing", Some("new"), None, None).unwrap();
        assert!(outcome.is_none());

        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].title, "rule r1");
    }

    #[test]
    fn update_merges_only_supplied_fields() {
        let db = test_db();
        db.insert_rule("r1", "Kitchen", "Clean up after use.", 2)
            .unwrap();

        let updated = db
            .update_rule("r1", None, None, Some(5))
            .unwrap()
            .expect("rule exists");
        assert_eq!(updated.title, "Kitchen");
        assert_eq!(updated.content, "Clean up after use.");
        assert_eq!(updated.display_order, 5);
    }

    #[test]
    fn delete_is_idempotent() {
        let db = test_db();
        add_rule(&db, "r1", 1);
        add_rule(&db, "r2", 2);

        db.delete_rule("r1").unwrap();
        let after_first = db.list_rules().unwrap().len();
        db.delete_rule("r1").unwrap();
        let after_second = db.list_rules().unwrap().len();

        assert_eq!(after_first, 1);
        assert_eq!(after_second, 1);
    }

    #[test]
    fn messages_list_newest_first() {
        let db = test_db();
        // Explicit timestamps: inserts in the same millisecond would tie.
        db.insert_message("m1", "sam", "first").unwrap();
        db.insert_message("m2", "sam", "second").unwrap();
        db.with_conn(|conn| {
            conn.execute("UPDATE messages SET timestamp = 100 WHERE id = 'm1'", [])?;
            conn.execute("UPDATE messages SET timestamp = 200 WHERE id = 'm2'", [])?;
            Ok(())
        })
        .unwrap();

        let ids: Vec<String> = db
            .list_messages()
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, ["m2", "m1"]);
    }

    #[test]
    fn mark_all_read_flips_every_unread_message_once() {
        let db = test_db();
        db.insert_message("m1", "sam", "hi").unwrap();
        db.insert_message("m2", "kim", "hello").unwrap();
        db.insert_message("m3", "sam", "again").unwrap();
        db.mark_message_read("m2").unwrap();

        assert_eq!(db.mark_all_messages_read().unwrap(), 2);
        assert_eq!(db.count_unread().unwrap(), 0);
        // second call is a no-op
        assert_eq!(db.mark_all_messages_read().unwrap(), 0);
    }

    #[test]
    fn mark_read_tolerates_absent_and_already_read_ids() {
        let db = test_db();
        db.insert_message("m1", "sam", "hi").unwrap();

        db.mark_message_read("m1").unwrap();
        db.mark_message_read("m1").unwrap();
        db.mark_message_read("ghost").unwrap();

        assert_eq!(db.count_unread().unwrap(), 0);
    }

    #[test]
    fn double_approval_leaves_one_ledger_row() {
        let db = test_db();
        db.get_or_create_user("sam", false, 5).unwrap();

        db.record_approval("sam").unwrap();
        db.record_approval("sam").unwrap();

        let approvals = db.list_approvals().unwrap();
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].user_name, "sam");
        assert!(db.has_approved("sam").unwrap());
    }

    #[test]
    fn approval_sets_the_user_flag_in_the_same_transaction() {
        let db = test_db();
        db.get_or_create_user("sam", false, 5).unwrap();
        db.record_approval("sam").unwrap();

        let user = db.get_user("sam").unwrap().expect("user exists");
        assert!(user.has_approved_rules);
    }

    #[test]
    fn user_flag_alone_counts_as_approved() {
        let db = test_db();
        db.get_or_create_user("kim", false, 5).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET has_approved_rules = 1 WHERE name = 'kim'",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        assert!(db.has_approved("kim").unwrap());
        assert!(db.list_approvals().unwrap().is_empty());
    }

    #[test]
    fn unknown_users_have_not_approved() {
        let db = test_db();
        assert!(!db.has_approved("nobody").unwrap());
    }

    #[test]
    fn approvals_list_first_approver_first() {
        let db = test_db();
        for name in ["a", "b"] {
            db.get_or_create_user(name, false, 5).unwrap();
            db.record_approval(name).unwrap();
        }
        db.with_conn(|conn| {
            conn.execute("UPDATE approvals SET timestamp = 10 WHERE user_name = 'b'", [])?;
            conn.execute("UPDATE approvals SET timestamp = 20 WHERE user_name = 'a'", [])?;
            Ok(())
        })
        .unwrap();

        let names: Vec<String> = db
            .list_approvals()
            .unwrap()
            .into_iter()
            .map(|a| a.user_name)
            .collect();
        assert_eq!(names, ["b", "a"]);
    }

    #[test]
    fn returning_user_is_not_promoted_to_admin() {
        let db = test_db();
        db.get_or_create_user("sam", false, 5).unwrap();

        match db.get_or_create_user("sam", true, 5).unwrap() {
            LoginOutcome::Existing(row) => assert!(!row.is_admin),
            _ => panic!("expected existing user"),
        }
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn capacity_is_enforced_for_new_names_only() {
        let db = test_db();
        for name in ["a", "b", "c"] {
            db.get_or_create_user(name, false, 3).unwrap();
        }

        assert!(matches!(
            db.get_or_create_user("d", false, 3).unwrap(),
            LoginOutcome::CapacityReached
        ));
        assert_eq!(db.count_users().unwrap(), 3);

        // a full house can still log back in
        assert!(matches!(
            db.get_or_create_user("a", false, 3).unwrap(),
            LoginOutcome::Existing(_)
        ));
    }

    #[test]
    fn reset_keeps_only_the_admin_and_bumps_the_generation() {
        let db = test_db();
        db.get_or_create_user("ahmed", true, 5).unwrap();
        db.get_or_create_user("sam", false, 5).unwrap();
        db.record_approval("sam").unwrap();
        db.insert_message("m1", "sam", "hello").unwrap();

        let before = db.reset_generation().unwrap();
        let after = db.reset_all("ahmed").unwrap();
        assert_eq!(after, before + 1);
        assert_eq!(db.reset_generation().unwrap(), after);

        assert!(db.list_approvals().unwrap().is_empty());
        assert_eq!(db.count_users().unwrap(), 1);
        assert!(db.get_user("ahmed").unwrap().is_some());
        assert!(db.list_messages().unwrap().is_empty());
    }
}
