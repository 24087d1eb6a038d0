//! Environment variable loading.

use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ServerConfig, TlsConfig};
use crate::voice::moss::DEFAULT_MOSS_API_URL;

pub(super) const HOST: &str = "HOST";
pub(super) const PORT: &str = "PORT";
pub(super) const TLS_ENABLED: &str = "TLS_ENABLED";
pub(super) const TLS_CERT_PATH: &str = "TLS_CERT_PATH";
pub(super) const TLS_KEY_PATH: &str = "TLS_KEY_PATH";
pub(super) const PROVIDER_TIMEOUT_SECONDS: &str = "PROVIDER_TIMEOUT_SECONDS";
pub(super) const MOSS_PROJECT_ID: &str = "MOSS_PROJECT_ID";
pub(super) const MOSS_PROJECT_KEY: &str = "MOSS_PROJECT_KEY";
pub(super) const MOSS_VOICE_AGENT_ID: &str = "MOSS_VOICE_AGENT_ID";
pub(super) const MOSS_API_URL: &str = "MOSS_API_URL";
pub(super) const CORS_ALLOWED_ORIGINS: &str = "CORS_ALLOWED_ORIGINS";
pub(super) const RATE_LIMIT_REQUESTS_PER_SECOND: &str = "RATE_LIMIT_REQUESTS_PER_SECOND";
pub(super) const RATE_LIMIT_BURST_SIZE: &str = "RATE_LIMIT_BURST_SIZE";

pub(super) const DEFAULT_HOST: &str = "0.0.0.0";
pub(super) const DEFAULT_PORT: u16 = 3000;
pub(super) const DEFAULT_PROVIDER_TIMEOUT_SECONDS: u64 = 10;
pub(super) const DEFAULT_RATE_LIMIT_RPS: u32 = 60;
pub(super) const DEFAULT_RATE_LIMIT_BURST: u32 = 10;

/// Non-empty value of `name`, if set.
fn var<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|v| !v.trim().is_empty())
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(lookup, name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                name,
                reason: format!("'{raw}': {e}"),
            }),
        None => Ok(default),
    }
}

pub(super) fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("'{other}' is not a boolean"),
        }),
    }
}

fn load_tls<F>(lookup: &F) -> Result<Option<TlsConfig>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let enabled = match var(lookup, TLS_ENABLED) {
        Some(raw) => parse_bool(TLS_ENABLED, &raw)?,
        None => false,
    };
    if !enabled {
        return Ok(None);
    }

    let cert_path = var(lookup, TLS_CERT_PATH).ok_or(ConfigError::MissingVar(TLS_CERT_PATH))?;
    let key_path = var(lookup, TLS_KEY_PATH).ok_or(ConfigError::MissingVar(TLS_KEY_PATH))?;
    Ok(Some(TlsConfig {
        cert_path: PathBuf::from(cert_path),
        key_path: PathBuf::from(key_path),
    }))
}

/// Build a configuration from environment variables and defaults.
///
/// No cross-field validation happens here; YAML overrides may still fill gaps.
pub(super) fn load<F>(lookup: &F) -> Result<ServerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(ServerConfig {
        host: var(lookup, HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_var(lookup, PORT, DEFAULT_PORT)?,
        tls: load_tls(lookup)?,
        provider_timeout_seconds: parse_var(
            lookup,
            PROVIDER_TIMEOUT_SECONDS,
            DEFAULT_PROVIDER_TIMEOUT_SECONDS,
        )?,
        moss_project_id: var(lookup, MOSS_PROJECT_ID),
        moss_project_key: var(lookup, MOSS_PROJECT_KEY),
        moss_voice_agent_id: var(lookup, MOSS_VOICE_AGENT_ID),
        moss_api_url: var(lookup, MOSS_API_URL).unwrap_or_else(|| DEFAULT_MOSS_API_URL.to_string()),
        cors_allowed_origins: var(lookup, CORS_ALLOWED_ORIGINS),
        rate_limit_requests_per_second: parse_var(
            lookup,
            RATE_LIMIT_REQUESTS_PER_SECOND,
            DEFAULT_RATE_LIMIT_RPS,
        )?,
        rate_limit_burst_size: parse_var(lookup, RATE_LIMIT_BURST_SIZE, DEFAULT_RATE_LIMIT_BURST)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_load_uses_defaults_when_nothing_set() {
        let config = load(&none).unwrap();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.tls.is_none());
        assert!(config.moss_project_id.is_none());
        assert_eq!(config.moss_api_url, DEFAULT_MOSS_API_URL);
        assert_eq!(config.provider_timeout_seconds, DEFAULT_PROVIDER_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_invalid_port_is_reported_with_variable_name() {
        let lookup = |key: &str| (key == PORT).then(|| "not-a-port".to_string());
        let err = load(&lookup).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let lookup = |key: &str| match key {
            TLS_ENABLED => Some("true".to_string()),
            TLS_CERT_PATH => Some("/certs/cert.pem".to_string()),
            _ => None,
        };
        let err = load(&lookup).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(TLS_KEY_PATH)));
    }

    #[test]
    fn test_parse_bool_variants() {
        assert!(parse_bool(TLS_ENABLED, "YES").unwrap());
        assert!(!parse_bool(TLS_ENABLED, "off").unwrap());
        assert!(parse_bool(TLS_ENABLED, "maybe").is_err());
    }
}
