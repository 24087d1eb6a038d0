//! Voice-server providers
//!
//! A voice-server provider hands out a [`VoiceServer`] handle that can mint
//! participant tokens for a room. Token signing stays with the provider; the
//! hosted Moss voice server ([`moss`]) is reached over HTTP.
//!
//! Building a handle is expensive (the hosted provider opens a session), so
//! the process keeps exactly one of them behind [`SharedVoiceServer`], which
//! builds it lazily on first use with single-flight semantics.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

pub mod lazy;
pub mod moss;

pub use lazy::{InitPanicked, LazyResource, SlotState};
pub use moss::{MossProvider, MossSettings, MossVoiceServer};

use crate::config::{ConfigError, ServerConfig};

/// Errors returned by a voice-server provider.
///
/// The error is `Clone` so that a single failed construction can be handed to
/// every caller waiting on it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VoiceServerError {
    #[error("Invalid voice server configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Voice server unreachable: {0}")]
    Network(String),

    #[error("Voice server request timed out: {0}")]
    Timeout(String),

    /// The provider answered with a non-success status. The message is the
    /// provider's own text and is shown to the client verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected voice server response: {0}")]
    InvalidResponse(String),

    /// Construction panicked. The panic text is logged, not sent to clients.
    #[error("Internal server error")]
    Panicked(String),
}

impl From<InitPanicked> for VoiceServerError {
    fn from(panicked: InitPanicked) -> Self {
        Self::Panicked(panicked.message)
    }
}

impl VoiceServerError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

pub type VoiceServerResult<T> = Result<T, VoiceServerError>;

/// Who a participant token is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantIdentity {
    /// Unique identity inside the room
    pub identity: String,
    /// Display name
    pub name: String,
}

impl ParticipantIdentity {
    pub fn new(identity: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
        }
    }
}

/// A ready-to-use handle on a voice server.
#[async_trait]
pub trait VoiceServer: Send + Sync {
    /// Address clients connect to for media.
    fn server_url(&self) -> &str;

    /// Mint a token that lets `participant` join `room_name`, dispatching
    /// `agent_name` into the room when one is given.
    async fn create_participant_token(
        &self,
        participant: &ParticipantIdentity,
        room_name: &str,
        agent_name: Option<&str>,
    ) -> VoiceServerResult<String>;
}

/// Builds [`VoiceServer`] handles from provider-specific settings.
#[async_trait]
pub trait VoiceServerProvider: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &'static str;

    /// Construct a new handle. May contact the remote service.
    async fn create(&self) -> VoiceServerResult<Arc<dyn VoiceServer>>;
}

/// Build the hosted provider from the Moss credentials in `config`.
pub fn provider_from_config(
    config: &ServerConfig,
) -> Result<Arc<dyn VoiceServerProvider>, ConfigError> {
    Ok(Arc::new(MossProvider::new(config.moss_settings()?)))
}

/// The process-wide voice-server handle, created on first demand.
pub struct SharedVoiceServer {
    provider: Arc<dyn VoiceServerProvider>,
    slot: LazyResource<Arc<dyn VoiceServer>, VoiceServerError>,
}

impl SharedVoiceServer {
    pub fn new(provider: Arc<dyn VoiceServerProvider>) -> Self {
        Self {
            provider,
            slot: LazyResource::new(),
        }
    }

    /// Return the shared handle, creating it if nobody has yet.
    ///
    /// Concurrent first callers share one construction. A failed construction
    /// is reported to everyone who waited on it and the next call tries again.
    pub async fn get(&self) -> VoiceServerResult<Arc<dyn VoiceServer>> {
        let provider = Arc::clone(&self.provider);
        self.slot
            .get_or_try_init(move || async move {
                let server = provider.create().await?;
                info!(
                    provider = provider.name(),
                    server_url = %server.server_url(),
                    "Voice server created"
                );
                Ok::<_, VoiceServerError>(server)
            })
            .await
    }

    pub fn state(&self) -> SlotState {
        self.slot.state()
    }

    pub fn is_ready(&self) -> bool {
        self.slot.state() == SlotState::Ready
    }

    /// Number of constructions started so far.
    pub fn attempts(&self) -> u64 {
        self.slot.attempts()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}
