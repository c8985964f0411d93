pub mod admin;
pub mod approvals;
pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod rules;
