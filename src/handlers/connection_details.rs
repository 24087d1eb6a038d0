//! Connection details endpoint
//!
//! `POST /api/connection-details` mints a participant token for a freshly
//! named voice-assistant room and returns everything a client needs to join:
//!
//! ```json
//! {
//!   "serverUrl": "wss://voice.example.com",
//!   "roomName": "voice_assistant_room_1234",
//!   "participantName": "user",
//!   "participantToken": "<opaque>"
//! }
//! ```
//!
//! The request body may name the agent to dispatch into the room:
//! `{"room_config": {"agents": [{"agent_name": "assistant-1"}]}}`. Only the
//! first agent is used; an absent body or field means no agent.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::utils::identifiers;
use crate::voice::ParticipantIdentity;

/// Display name given to every participant.
pub const PARTICIPANT_NAME: &str = "user";

/// Request body; every level is optional and unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConnectionDetailsRequest {
    pub room_config: Option<RoomConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    pub agents: Option<Vec<AgentDispatch>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AgentDispatch {
    pub agent_name: Option<String>,
}

impl ConnectionDetailsRequest {
    /// Decode a request body. An empty body is the same as `{}`.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_json::from_slice(body)?)
    }

    /// `room_config.agents[0].agent_name`, if every level is present.
    pub fn agent_name(&self) -> Option<&str> {
        self.room_config
            .as_ref()?
            .agents
            .as_ref()?
            .first()?
            .agent_name
            .as_deref()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub server_url: String,
    pub room_name: String,
    pub participant_name: String,
    pub participant_token: String,
}

/// Mint a participant token and return the connection details.
pub async fn connection_details(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> AppResult<Response> {
    let request = ConnectionDetailsRequest::from_body(&body)?;
    let agent_name = request.agent_name();

    let participant = ParticipantIdentity::new(identifiers::participant_identity(), PARTICIPANT_NAME);
    let room_name = identifiers::room_name();

    debug!(
        room_name = %room_name,
        identity = %participant.identity,
        agent_name = ?agent_name,
        "Creating connection details"
    );

    let voice_server = state
        .voice_server
        .get()
        .await
        .map_err(AppError::ResourceInitialization)?;

    let participant_token = voice_server
        .create_participant_token(&participant, &room_name, agent_name)
        .await
        .map_err(AppError::TokenMinting)?;

    info!(
        room_name = %room_name,
        identity = %participant.identity,
        "Issued participant token"
    );

    let details = ConnectionDetails {
        server_url: voice_server.server_url().to_string(),
        room_name,
        participant_name: PARTICIPANT_NAME.to_string(),
        participant_token,
    };

    Ok((
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(details),
    )
        .into_response())
}
