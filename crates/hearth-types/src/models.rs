use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A housemate. `name` is the natural key everywhere: users, approvals
/// and messages all reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub is_admin: bool,
    pub has_approved_rules: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry on the shared house-rules board. `content` may use the small
/// inline markup vocabulary rendered by `hearth-markup`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Display rank, ascending. Not required to be unique or contiguous;
    /// ties keep insertion order.
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A one-way message from a housemate to the administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_name: String,
    pub content: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Ledger entry recording that a user accepted the current rules.
/// At most one per user name; re-approval overwrites in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub user_name: String,
    pub approved_at: DateTime<Utc>,
    /// Epoch millis, used for display ordering (first approver first).
    pub timestamp: i64,
}
