//! Session lifecycle handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::{AppError, AppState};
use outlay_core::SessionId;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Serialize)]
pub struct DeleteSessionResponse {
    pub success: bool,
    pub session_id: SessionId,
}

/// DELETE /api/sessions/:id - End a session and drop its ledger
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteSessionResponse>, AppError> {
    let session = SessionId::from(id);

    if !state
        .store
        .delete_session(&session)
        .map_err(AppError::from_core)?
    {
        return Err(AppError::not_found("Session not found or expired"));
    }

    info!(session = %session, "Session ended");
    Ok(Json(DeleteSessionResponse {
        success: true,
        session_id: session,
    }))
}
