//! Configuration validation logic.

use super::{ConfigError, ServerConfig};

/// Every Moss credential must be present and the API URL well formed.
/// Missing credentials fail at startup, not on first request.
pub(super) fn validate_moss_credentials(config: &ServerConfig) -> Result<(), ConfigError> {
    config
        .moss_settings()?
        .validate()
        .map_err(|e| ConfigError::InvalidValue {
            name: "MOSS_API_URL",
            reason: e.to_string(),
        })
}

pub(super) fn validate_rate_limits(rps: u32, burst: u32) -> Result<(), ConfigError> {
    if rps == 0 {
        return Err(ConfigError::InvalidValue {
            name: "RATE_LIMIT_REQUESTS_PER_SECOND",
            reason: "must be greater than zero".to_string(),
        });
    }
    if burst == 0 {
        return Err(ConfigError::InvalidValue {
            name: "RATE_LIMIT_BURST_SIZE",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

pub(super) fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
    if seconds == 0 {
        return Err(ConfigError::InvalidValue {
            name: "PROVIDER_TIMEOUT_SECONDS",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
