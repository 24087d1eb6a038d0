use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;
use crate::voice::SlotState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub voice_provider: &'static str,
    /// `empty`, `pending` or `ready`; never triggers construction
    pub voice_server: &'static str,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let voice_server = match state.voice_server.state() {
        SlotState::Empty => "empty",
        SlotState::Pending => "pending",
        SlotState::Ready => "ready",
    };

    Json(HealthResponse {
        status: "OK",
        voice_provider: state.voice_server.provider_name(),
        voice_server,
    })
}
