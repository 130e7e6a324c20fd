use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
};
use std::net::SocketAddr;
use tracing::warn;

use crate::core::attendance::{AttendanceError, AttendanceOutcome, AttendanceRequest};

use super::super::AppState;

/// The origin check runs before the body is inspected, so callers outside
/// the allow-list get 403 whatever they send.
pub async fn record_attendance(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> Result<Json<AttendanceOutcome>, AttendanceError> {
    let remote_ip = peer.ip().to_canonical().to_string();
    if let Err(e) = state.service.admit(&remote_ip) {
        warn!("Attendance request rejected: {}", e);
        return Err(e);
    }
    let Json(payload) = payload.map_err(|rejection| {
        warn!("Malformed attendance body from {}: {}", remote_ip, rejection.body_text());
        AttendanceError::MalformedRequest(rejection.body_text())
    })?;
    let outcome = state.service.record(&payload, &remote_ip).await?;
    Ok(Json(outcome))
}
