use serde::{Deserialize, Serialize};

use crate::models::{Rule, User};
use crate::session::Gate;
use hearth_markup::Line;

// -- JWT Claims --

/// JWT claims shared across hearth-api (REST middleware) and hearth-gateway
/// (WebSocket authentication). Canonical definition lives here in
/// hearth-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User name, the natural key.
    pub sub: String,
    pub admin: bool,
    /// Reset generation the token was minted under. Tokens from an older
    /// generation are rejected, which is what forces re-login after a
    /// global reset.
    #[serde(rename = "gen")]
    pub generation: i64,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub name: String,
    /// Only checked when `admin` is set.
    pub password: Option<String>,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub state: Gate,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: User,
    pub state: Gate,
}

// -- Rules --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateRuleRequest {
    pub title: String,
    pub content: String,
    /// Defaults to 1 when omitted.
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRuleRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i64>,
}

/// A rule plus its content rendered into styled spans, so clients never
/// have to re-implement the markup grammar.
#[derive(Debug, Serialize)]
pub struct RuleResponse {
    #[serde(flatten)]
    pub rule: Rule,
    pub rendered: Vec<Line>,
}

impl From<Rule> for RuleResponse {
    fn from(rule: Rule) -> Self {
        let rendered = hearth_markup::render(&rule.content);
        Self { rule, rendered }
    }
}

// -- Approvals --

#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub approval: crate::models::Approval,
    /// The session's gate state after the approval (always active).
    pub state: Gate,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
}
