//! Apply YAML overrides on top of the environment-derived configuration.

use std::path::PathBuf;

use super::yaml::YamlConfig;
use super::{ConfigError, ServerConfig, TlsConfig};

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn set_opt(target: &mut Option<String>, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        *target = Some(value);
    }
}

pub(super) fn apply_yaml(config: &mut ServerConfig, yaml: YamlConfig) -> Result<(), ConfigError> {
    if let Some(server) = yaml.server {
        set(&mut config.host, server.host);
        set(&mut config.port, server.port);

        if let Some(tls) = server.tls {
            match tls.enabled {
                Some(false) => config.tls = None,
                Some(true) => {
                    let cert_path = tls
                        .cert_path
                        .or_else(|| config.tls.as_ref().map(|t| t.cert_path.display().to_string()))
                        .ok_or(ConfigError::MissingVar("server.tls.cert_path"))?;
                    let key_path = tls
                        .key_path
                        .or_else(|| config.tls.as_ref().map(|t| t.key_path.display().to_string()))
                        .ok_or(ConfigError::MissingVar("server.tls.key_path"))?;
                    config.tls = Some(TlsConfig {
                        cert_path: PathBuf::from(cert_path),
                        key_path: PathBuf::from(key_path),
                    });
                }
                None => {
                    if let Some(existing) = config.tls.as_mut() {
                        if let Some(cert) = tls.cert_path {
                            existing.cert_path = PathBuf::from(cert);
                        }
                        if let Some(key) = tls.key_path {
                            existing.key_path = PathBuf::from(key);
                        }
                    }
                }
            }
        }
    }

    if let Some(voice) = yaml.voice {
        set(&mut config.provider_timeout_seconds, voice.timeout_seconds);
    }

    if let Some(moss) = yaml.moss {
        set_opt(&mut config.moss_project_id, moss.project_id);
        set_opt(&mut config.moss_project_key, moss.project_key);
        set_opt(&mut config.moss_voice_agent_id, moss.voice_agent_id);
        set(&mut config.moss_api_url, moss.api_url);
    }

    if let Some(security) = yaml.security {
        set_opt(&mut config.cors_allowed_origins, security.cors_allowed_origins);
        set(
            &mut config.rate_limit_requests_per_second,
            security.rate_limit_requests_per_second,
        );
        set(&mut config.rate_limit_burst_size, security.rate_limit_burst_size);
    }

    Ok(())
}
