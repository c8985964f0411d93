use std::sync::atomic::Ordering;

use axum::{Extension, Json, extract::State};
use tracing::info;

use hearth_types::api::Claims;
use hearth_types::events::GatewayEvent;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::require_admin;

/// Global reset: delete every user except the reserved admin, every
/// approval and every message, then bump the reset generation so all
/// outstanding sessions are forced back through login. One transaction;
/// any failure rolls back and is reported so the caller can retry the
/// whole thing.
pub async fn reset_all(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_admin(&claims)?;

    let db = state.clone();
    let admin_name = state.admin_name.clone();
    let generation = tokio::task::spawn_blocking(move || db.db.reset_all(&admin_name))
        .await
        .map_err(join_error)??;

    state.reset_generation.store(generation, Ordering::Release);
    state
        .dispatcher
        .broadcast(GatewayEvent::DataReset { generation });

    info!("Global reset complete (generation {})", generation);

    Ok(Json(
        serde_json::json!({ "reset": true, "generation": generation }),
    ))
}
