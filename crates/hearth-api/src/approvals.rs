use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use hearth_types::api::{ApproveResponse, Claims};
use hearth_types::events::GatewayEvent;
use hearth_types::models::Approval;
use hearth_types::session::Gate;

use crate::auth::AppState;
use crate::error::{ApiError, join_error};
use crate::middleware::require_admin;

/// Record that the session's user accepts the current rules. Idempotent:
/// a second call overwrites the ledger entry rather than duplicating it.
/// The ledger row and the user-record flag are written as one unit.
pub async fn record_approval(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let name = claims.sub.clone();
    let db = state.clone();
    let row = tokio::task::spawn_blocking(move || db.db.record_approval(&name))
        .await
        .map_err(join_error)??;

    let approval = row.into_model();
    state.dispatcher.broadcast(GatewayEvent::ApprovalRecorded {
        approval: approval.clone(),
    });

    Ok((
        StatusCode::CREATED,
        Json(ApproveResponse {
            approval,
            state: Gate::PendingApproval {
                admin: claims.admin,
            }
            .approve(),
        }),
    ))
}

/// The approval ledger, first approver first. Admin view.
pub async fn list_approvals(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Approval>>, ApiError> {
    require_admin(&claims)?;

    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_approvals())
        .await
        .map_err(join_error)??;

    Ok(Json(rows.into_iter().map(|row| row.into_model()).collect()))
}
