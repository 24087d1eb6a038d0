//! Hosted Moss voice-server client.
//!
//! Creating a [`MossVoiceServer`] opens a voice session for the configured
//! project and voice agent:
//!
//! - `POST {api_url}/v1/voice-server/sessions` with `{"voice_agent_id"}`
//!   returns `{"server_url", "session_id"}`
//! - `POST {api_url}/v1/voice-server/tokens` with the session, identity, room
//!   and optional agent name returns `{"token"}`
//!
//! Both calls authenticate with `Authorization: Bearer <project key>` and an
//! `X-Moss-Project-Id` header. Non-success answers are surfaced as
//! [`VoiceServerError::Rejected`] carrying the provider's message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;
use zeroize::Zeroizing;

use super::{
    ParticipantIdentity, VoiceServer, VoiceServerError, VoiceServerProvider, VoiceServerResult,
};

pub const DEFAULT_MOSS_API_URL: &str = "https://api.moss.dev";
pub const PROJECT_ID_HEADER: &str = "X-Moss-Project-Id";

const SESSIONS_PATH: &str = "v1/voice-server/sessions";
const TOKENS_PATH: &str = "v1/voice-server/tokens";

/// Credentials and endpoint for the hosted provider.
#[derive(Clone)]
pub struct MossSettings {
    pub project_id: String,
    pub project_key: Zeroizing<String>,
    pub voice_agent_id: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for MossSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MossSettings")
            .field("project_id", &self.project_id)
            .field("project_key", &"<redacted>")
            .field("voice_agent_id", &self.voice_agent_id)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl MossSettings {
    pub fn validate(&self) -> VoiceServerResult<()> {
        let required = [
            ("project id", self.project_id.as_str()),
            ("project key", self.project_key.as_str()),
            ("voice agent id", self.voice_agent_id.as_str()),
        ];
        for (label, value) in required {
            if value.trim().is_empty() {
                return Err(VoiceServerError::InvalidConfiguration(format!(
                    "Moss {label} is empty"
                )));
            }
        }

        let url = Url::parse(&self.api_url).map_err(|e| {
            VoiceServerError::InvalidConfiguration(format!(
                "Invalid Moss API URL '{}': {}",
                self.api_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(VoiceServerError::InvalidConfiguration(format!(
                "Moss API URL must use http or https, got: {}",
                url.scheme()
            )));
        }

        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest<'a> {
    voice_agent_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    #[serde(alias = "serverUrl")]
    server_url: String,
    #[serde(alias = "sessionId")]
    session_id: String,
}

#[derive(Debug, Serialize)]
struct CreateTokenRequest<'a> {
    session_id: &'a str,
    voice_agent_id: &'a str,
    identity: &'a str,
    name: &'a str,
    room_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    agent_name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateTokenResponse {
    #[serde(alias = "participantToken", alias = "participant_token")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Pull a human-readable message out of an error response body.
///
/// Accepts `{"error": "..."}`, `{"message": "..."}` or plain text.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ProviderErrorBody>(body) {
        if let Some(message) = parsed.error.or(parsed.message) {
            if !message.trim().is_empty() {
                return message;
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Voice server request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> VoiceServerResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        warn!(status = status.as_u16(), %message, "Moss voice server rejected request");
        return Err(VoiceServerError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| VoiceServerError::InvalidResponse(e.to_string()))
}

/// A live session on the hosted Moss voice server.
pub struct MossVoiceServer {
    http: Client,
    settings: MossSettings,
    session_id: String,
    server_url: String,
}

impl MossVoiceServer {
    /// Open a session for the configured project and voice agent.
    pub async fn create(settings: MossSettings) -> VoiceServerResult<Self> {
        settings.validate()?;

        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| VoiceServerError::InvalidConfiguration(e.to_string()))?;

        debug!(
            project_id = %settings.project_id,
            voice_agent_id = %settings.voice_agent_id,
            "Opening Moss voice server session"
        );

        let response = http
            .post(settings.endpoint(SESSIONS_PATH))
            .bearer_auth(settings.project_key.as_str())
            .header(PROJECT_ID_HEADER, &settings.project_id)
            .json(&CreateSessionRequest {
                voice_agent_id: &settings.voice_agent_id,
            })
            .send()
            .await
            .map_err(VoiceServerError::from_reqwest)?;

        let session: CreateSessionResponse = read_json(response).await?;
        if session.server_url.trim().is_empty() {
            return Err(VoiceServerError::InvalidResponse(
                "session response has an empty server_url".to_string(),
            ));
        }

        Ok(Self {
            http,
            settings,
            session_id: session.session_id,
            server_url: session.server_url,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

#[async_trait]
impl VoiceServer for MossVoiceServer {
    fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn create_participant_token(
        &self,
        participant: &ParticipantIdentity,
        room_name: &str,
        agent_name: Option<&str>,
    ) -> VoiceServerResult<String> {
        let response = self
            .http
            .post(self.settings.endpoint(TOKENS_PATH))
            .bearer_auth(self.settings.project_key.as_str())
            .header(PROJECT_ID_HEADER, &self.settings.project_id)
            .json(&CreateTokenRequest {
                session_id: &self.session_id,
                voice_agent_id: &self.settings.voice_agent_id,
                identity: &participant.identity,
                name: &participant.name,
                room_name,
                agent_name,
            })
            .send()
            .await
            .map_err(VoiceServerError::from_reqwest)?;

        let minted: CreateTokenResponse = read_json(response).await?;
        debug!(
            room_name,
            identity = %participant.identity,
            "Minted participant token"
        );
        Ok(minted.token)
    }
}

/// [`VoiceServerProvider`] for the hosted Moss service.
pub struct MossProvider {
    settings: MossSettings,
}

impl MossProvider {
    pub fn new(settings: MossSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl VoiceServerProvider for MossProvider {
    fn name(&self) -> &'static str {
        "moss"
    }

    async fn create(&self) -> VoiceServerResult<Arc<dyn VoiceServer>> {
        let server = MossVoiceServer::create(self.settings.clone()).await?;
        Ok(Arc::new(server))
    }
}
