use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use rand::Rng;

use hearth_types::api::{Claims, SendMessageRequest};
use hearth_types::events::GatewayEvent;
use hearth_types::models::Message;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::require_admin;

/// Any housemate who has accepted the rules may write to the admin inbox.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::Validation("message content is required".into()));
    }

    if !state.db.has_approved(&claims.sub)? {
        return Err(ApiError::Unauthorized(
            "approve the house rules before sending messages".into(),
        ));
    }

    let id = time_id();
    let sender = claims.sub.clone();
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.insert_message(&id, &sender, &content))
        .await
        .map_err(join_error)??;

    let message = row.into_model();
    state.dispatcher.broadcast(GatewayEvent::MessageCreated {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

/// The inbox belongs to the administrator.
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Message>>, ApiError> {
    require_admin(&claims)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_messages())
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(|row| row.into_model()).collect()))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&claims)?;

    let db = state.clone();
    let message_id = id.clone();
    tokio::task::spawn_blocking(move || db.db.mark_message_read(&message_id))
        .await
        .map_err(join_error)??;

    state.dispatcher.broadcast(GatewayEvent::MessageRead { id });

    Ok(Json(serde_json::json!({ "read": true })))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&claims)?;

    let db = state.clone();
    let count = tokio::task::spawn_blocking(move || db.db.mark_all_messages_read())
        .await
        .map_err(join_error)??;

    state.dispatcher.broadcast(GatewayEvent::AllMessagesRead {
        count: count as u64,
    });

    Ok(Json(serde_json::json!({ "marked": count })))
}

/// Time-derived message id: epoch millis in base36 plus a short random
/// suffix, so two sends landing in the same millisecond stay distinct.
fn time_id() -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let mut id = to_base36(millis);
    id.push('-');

    let mut rng = rand::rng();
    for _ in 0..4 {
        id.push(DIGITS[rng.random_range(0..36)] as char);
    }
    id
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base36_round_trips_known_values() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(1295), "zz");
        assert_eq!(to_base36(1296), "100");
    }

    #[test]
    fn time_ids_do_not_collide_within_a_millisecond() {
        let ids: std::collections::HashSet<String> = (0..200).map(|_| time_id()).collect();
        assert_eq!(ids.len(), 200);
    }
}
