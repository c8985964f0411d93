/// Database row types mapping directly to SQLite rows.
/// Distinct from the hearth-types API models to keep the DB layer
/// independent; timestamps live here as TEXT and are parsed leniently
/// on the way out.
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use hearth_types::models::{Approval, Message, Rule, User};

pub struct UserRow {
    pub name: String,
    pub is_admin: bool,
    pub has_approved_rules: bool,
    pub created_at: String,
}

pub struct RuleRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub display_order: i64,
    pub created_at: String,
    pub updated_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub sender_name: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: String,
    pub timestamp: i64,
}

pub struct ApprovalRow {
    pub user_name: String,
    pub approved_at: String,
    pub timestamp: i64,
}

/// Parse a stored timestamp. Rows written by this crate are RFC 3339, but
/// SQLite's own `datetime('now')` format ("YYYY-MM-DD HH:MM:SS") is
/// accepted too for rows imported from elsewhere.
pub(crate) fn parse_timestamp(raw: &str, context: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

impl UserRow {
    pub fn into_model(self) -> User {
        let created_at = parse_timestamp(&self.created_at, &format!("user '{}'", self.name));
        User {
            name: self.name,
            is_admin: self.is_admin,
            has_approved_rules: self.has_approved_rules,
            created_at,
        }
    }
}

impl RuleRow {
    pub fn into_model(self) -> Rule {
        let created_at = parse_timestamp(&self.created_at, &format!("rule '{}'", self.id));
        let updated_at = parse_timestamp(&self.updated_at, &format!("rule '{}'", self.id));
        Rule {
            id: self.id,
            title: self.title,
            content: self.content,
            order: self.display_order,
            created_at,
            updated_at,
        }
    }
}

impl MessageRow {
    pub fn into_model(self) -> Message {
        let created_at = parse_timestamp(&self.created_at, &format!("message '{}'", self.id));
        Message {
            id: self.id,
            sender_name: self.sender_name,
            content: self.content,
            is_read: self.is_read,
            created_at,
        }
    }
}

impl ApprovalRow {
    pub fn into_model(self) -> Approval {
        let approved_at =
            parse_timestamp(&self.approved_at, &format!("approval '{}'", self.user_name));
        Approval {
            user_name: self.user_name,
            approved_at,
            timestamp: self.timestamp,
        }
    }
}
