//! Subscription and overspending handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AppError, AppState};
use outlay_core::{
    detect::{detect_overspending_with_config, detect_subscriptions_with_config},
    OverspendingRecord, OverspendingSummary, SessionId, SubscriptionRecord, Transaction,
};

/// Query params identifying a session
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

#[derive(Serialize)]
pub struct SubscriptionsResponse {
    pub success: bool,
    pub count: usize,
    pub subscriptions: Vec<SubscriptionRecord>,
}

#[derive(Serialize)]
pub struct OverspendingResponse {
    pub success: bool,
    pub summary: OverspendingSummary,
    pub months: Vec<OverspendingRecord>,
}

/// GET /api/subscriptions?session_id= - Detect recurring charges
///
/// Detection reruns over the whole ledger and the result replaces the
/// session's stored subscription set.
pub async fn get_subscriptions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SubscriptionsResponse>, AppError> {
    let (session, ledger) = load_ledger(&state, &query)?;

    let subscriptions = detect_subscriptions_with_config(&ledger, &state.config.detection);
    state
        .store
        .put_subscriptions(&session, &subscriptions)
        .map_err(AppError::from_core)?;

    debug!(session = %session, count = subscriptions.len(), "Subscriptions detected");
    Ok(Json(SubscriptionsResponse {
        success: true,
        count: subscriptions.len(),
        subscriptions,
    }))
}

/// GET /api/overspending?session_id= - Classify months against their trailing baseline
pub async fn get_overspending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<OverspendingResponse>, AppError> {
    let (session, ledger) = load_ledger(&state, &query)?;

    let months = detect_overspending_with_config(&ledger, &state.config.detection);
    let summary = OverspendingSummary::from_records(&months);

    debug!(
        session = %session,
        analyzed = summary.total_analyzed,
        overspending = summary.overspending_count,
        "Overspending analysed"
    );
    Ok(Json(OverspendingResponse {
        success: true,
        summary,
        months,
    }))
}

fn load_ledger(
    state: &AppState,
    query: &SessionQuery,
) -> Result<(SessionId, Vec<Transaction>), AppError> {
    let session = query
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(SessionId::from)
        .ok_or_else(|| AppError::bad_request("session_id query parameter is required"))?;

    let ledger = state
        .store
        .get_ledger(&session)
        .map_err(AppError::from_core)?
        .ok_or_else(|| AppError::bad_request("No statement has been uploaded for this session"))?;

    Ok((session, ledger))
}
