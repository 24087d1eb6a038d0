use std::sync::Arc;

use crate::config::{ConfigError, ServerConfig};
use crate::voice::{SharedVoiceServer, VoiceServerProvider, provider_from_config};

/// Application state shared by all handlers
pub struct AppState {
    pub config: ServerConfig,
    /// Process-wide voice-server handle, built on first request
    pub voice_server: SharedVoiceServer,
}

impl AppState {
    /// Build state with the provider selected by `config`.
    pub fn new(config: ServerConfig) -> Result<Arc<Self>, ConfigError> {
        let provider = provider_from_config(&config)?;
        Ok(Self::with_provider(config, provider))
    }

    /// Build state around an explicit provider.
    pub fn with_provider(config: ServerConfig, provider: Arc<dyn VoiceServerProvider>) -> Arc<Self> {
        Arc::new(Self {
            config,
            voice_server: SharedVoiceServer::new(provider),
        })
    }
}
