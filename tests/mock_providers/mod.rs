//! Mock voice-server provider
//!
//! Stands in for a real provider in router tests:
//! - counts how many handles were created
//! - optional construction latency, so concurrent first requests overlap
//! - configurable construction failures or panics and token behaviour
//! - records every token request it receives

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use moss_connect::ServerConfig;
use moss_connect::voice::{
    ParticipantIdentity, VoiceServer, VoiceServerError, VoiceServerProvider, VoiceServerResult,
};

pub const MOCK_SERVER_URL: &str = "wss://mock-voice.example.com";

/// Minimal configuration pointing the Moss provider at `moss_api_url`
pub fn create_test_config(moss_api_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        provider_timeout_seconds: 5,
        moss_project_id: Some("test-project".to_string()),
        moss_project_key: Some("test-project-key".to_string()),
        moss_voice_agent_id: Some("test-voice-agent".to_string()),
        moss_api_url: moss_api_url.to_string(),
        cors_allowed_origins: None,
        rate_limit_requests_per_second: 100000, // Disable for tests
        rate_limit_burst_size: 100,
    }
}

/// What the mock does when asked for a participant token
#[derive(Clone, Debug)]
pub enum TokenBehavior {
    Issue,
    Reject(String),
    Panic,
}

/// One recorded `create_participant_token` call
#[derive(Clone, Debug)]
pub struct TokenCall {
    pub participant: ParticipantIdentity,
    pub room_name: String,
    pub agent_name: Option<String>,
}

pub struct MockProvider {
    creations: AtomicUsize,
    create_delay: Duration,
    failures_before_success: AtomicUsize,
    panics_before_success: AtomicUsize,
    token_behavior: TokenBehavior,
    calls: Arc<Mutex<Vec<TokenCall>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            creations: AtomicUsize::new(0),
            create_delay: Duration::ZERO,
            failures_before_success: AtomicUsize::new(0),
            panics_before_success: AtomicUsize::new(0),
            token_behavior: TokenBehavior::Issue,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = delay;
        self
    }

    /// Fail the first `count` constructions with a network error
    pub fn failing_first(self, count: usize) -> Self {
        self.failures_before_success.store(count, Ordering::SeqCst);
        self
    }

    /// Panic inside the first `count` constructions
    pub fn panicking_first(self, count: usize) -> Self {
        self.panics_before_success.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_token_behavior(mut self, behavior: TokenBehavior) -> Self {
        self.token_behavior = behavior;
        self
    }

    pub fn creations(&self) -> usize {
        self.creations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<TokenCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl VoiceServerProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create(&self) -> VoiceServerResult<Arc<dyn VoiceServer>> {
        self.creations.fetch_add(1, Ordering::SeqCst);
        if !self.create_delay.is_zero() {
            tokio::time::sleep(self.create_delay).await;
        }

        let should_panic = self
            .panics_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_panic {
            panic!("mock backend crashed during session setup");
        }

        let should_fail = self
            .failures_before_success
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(VoiceServerError::Network(
                "mock backend unreachable".to_string(),
            ));
        }

        Ok(Arc::new(MockVoiceServer {
            token_behavior: self.token_behavior.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct MockVoiceServer {
    token_behavior: TokenBehavior,
    calls: Arc<Mutex<Vec<TokenCall>>>,
}

#[async_trait]
impl VoiceServer for MockVoiceServer {
    fn server_url(&self) -> &str {
        MOCK_SERVER_URL
    }

    async fn create_participant_token(
        &self,
        participant: &ParticipantIdentity,
        room_name: &str,
        agent_name: Option<&str>,
    ) -> VoiceServerResult<String> {
        self.calls.lock().push(TokenCall {
            participant: participant.clone(),
            room_name: room_name.to_string(),
            agent_name: agent_name.map(str::to_string),
        });

        match &self.token_behavior {
            TokenBehavior::Issue => Ok(format!(
                "token-for-{}-in-{}",
                participant.identity, room_name
            )),
            TokenBehavior::Reject(message) => Err(VoiceServerError::Rejected {
                status: 400,
                message: message.clone(),
            }),
            TokenBehavior::Panic => panic!("provider exploded"),
        }
    }
}
