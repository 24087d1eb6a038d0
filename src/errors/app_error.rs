//! Request-level errors and their HTTP mapping.
//!
//! Every failure of the connection-details endpoint becomes a `500` with a
//! plain-text body carrying the error message, so clients always get exactly
//! one deterministic response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::voice::VoiceServerError;

#[derive(Debug, Error)]
pub enum AppError {
    /// The inbound JSON body could not be decoded.
    #[error("{0}")]
    RequestBodyParse(String),

    /// The shared voice-server handle could not be constructed.
    #[error(transparent)]
    ResourceInitialization(VoiceServerError),

    /// The provider refused or failed to mint a participant token.
    #[error(transparent)]
    TokenMinting(VoiceServerError),

    #[error("{0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    /// Stable label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RequestBodyParse(_) => "request_body_parse",
            Self::ResourceInitialization(_) => "resource_initialization",
            Self::TokenMinting(_) => "token_minting",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::RequestBodyParse(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        error!(kind = self.kind(), error = %message, "Connection details request failed");
        (self.status_code(), message).into_response()
    }
}
