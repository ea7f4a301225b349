//! Health endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::ServerError;
use crate::state::AppState;

/// Response for GET /healthz.
#[derive(Serialize)]
pub(crate) struct HealthResponse {
    /// Always `"ok"` when a snapshot is being served.
    status: &'static str,
    /// Fingerprint of the active snapshot.
    fingerprint: String,
    /// Active slot (`"A"` or `"B"`).
    slot: String,
    /// Routed documents in the active snapshot, not counting the index.
    documents: usize,
}

/// Handle GET /healthz.
pub(crate) async fn get_health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, ServerError> {
    let (slot, snapshot) = state.engine.active_with_slot();
    let snapshot = snapshot.ok_or(ServerError::NotReady)?;

    Ok(Json(HealthResponse {
        status: "ok",
        fingerprint: snapshot.fingerprint().to_owned(),
        slot: slot.to_string(),
        documents: snapshot.len(),
    }))
}
